// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn items_are_delivered_in_post_order() {
    let (inbox, mut consumer) = Inbox::channel();
    inbox.post(InboxItem::Reset { source: "a".into() });
    inbox.post(InboxItem::Reset { source: "b".into() });
    let first = consumer.next().await.unwrap();
    let second = consumer.next().await.unwrap();
    assert!(matches!(first.item, InboxItem::Reset { source } if source == "a"));
    assert!(matches!(second.item, InboxItem::Reset { source } if source == "b"));
}

#[tokio::test]
async fn post_and_wait_resolves_after_complete() {
    let (inbox, mut consumer) = Inbox::channel();
    let rx = inbox.post_and_wait(InboxItem::Restore);
    let envelope = consumer.next().await.unwrap();
    envelope.complete();
    assert!(rx.await.is_ok());
}

#[tokio::test]
async fn dropping_consumer_cancels_pending_completions() {
    let (inbox, consumer) = Inbox::channel();
    let rx = inbox.post_and_wait(InboxItem::Restore);
    drop(consumer);
    assert!(rx.await.is_err());
}

#[tokio::test]
async fn next_returns_none_once_all_inbox_handles_dropped() {
    let (inbox, mut consumer) = Inbox::channel();
    drop(inbox);
    assert!(consumer.next().await.is_none());
}
