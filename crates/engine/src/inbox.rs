// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-agent FIFO inbox: one [`Inbox`] handle per agent for posting
//! work, one [`InboxConsumer`] held by the agent's single consumer loop.
//!
//! An unbounded `tokio::mpsc` channel gives FIFO ordering and `Send`-safe
//! posting for free. Completion handles are a plain `oneshot`, used for
//! request/response inbox items that need to signal when they've drained.

use tokio::sync::{mpsc, oneshot};

use crate::descriptor::PermissionDecision;
use crate::event::RoutingContext;
use crate::message::Message;

/// One unit of work bound to a single agent. See §3 `InboxItem`.
#[derive(Debug, Clone)]
pub enum InboxItem {
    Message { message: Message, source: String, context: RoutingContext },
    PermissionDecision { decision: PermissionDecision, source: String, context: RoutingContext },
    Reset { source: String },
    Restore,
}

/// An inbox item paired with an optional completion signal.
pub struct Envelope {
    pub item: InboxItem,
    completion: Option<oneshot::Sender<()>>,
}

impl Envelope {
    /// Signal that this item's processing has finished. A no-op if no
    /// caller is waiting.
    pub fn complete(self) {
        if let Some(tx) = self.completion {
            let _ = tx.send(());
        }
    }

    /// Split into the item to process and a token to complete once
    /// processing is actually done, for callers that need to act on the
    /// item before firing completion.
    pub fn split(self) -> (InboxItem, CompletionToken) {
        (self.item, CompletionToken(self.completion))
    }
}

/// A completion signal detached from its item. Firing it is a no-op if no
/// caller is waiting on the corresponding `post_and_wait`.
pub struct CompletionToken(Option<oneshot::Sender<()>>);

impl CompletionToken {
    pub fn complete(self) {
        if let Some(tx) = self.0 {
            let _ = tx.send(());
        }
    }
}

/// Posting handle for an agent's inbox. Cheaply cloneable; safe to share
/// across the AgentSystem dispatcher and background-spawn paths.
#[derive(Clone)]
pub struct Inbox {
    tx: mpsc::UnboundedSender<Envelope>,
}

/// The single-consumer side, held only by the owning [`crate::agent`] loop.
pub struct InboxConsumer {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Inbox {
    pub fn channel() -> (Self, InboxConsumer) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, InboxConsumer { rx })
    }

    /// Post an item without waiting for it to be processed. Total order
    /// with respect to other `post`/`post_and_wait` calls on this handle
    /// (and its clones) is preserved by the channel.
    pub fn post(&self, item: InboxItem) {
        let _ = self.tx.send(Envelope { item, completion: None });
    }

    /// Post an item and return a receiver resolved once the agent loop
    /// calls [`Envelope::complete`]. If the agent is gone (reset mid-flight,
    /// shutdown, or the consumer dropped before draining this item), the
    /// receiver resolves to `Err` — the cancellation error required by §4.3,
    /// which falls out of the oneshot sender being dropped rather than
    /// fired.
    pub fn post_and_wait(&self, item: InboxItem) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(Envelope { item, completion: Some(tx) });
        rx
    }

    /// Whether any consumer is still attached.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl InboxConsumer {
    /// Await the next item. Returns `None` once every [`Inbox`] handle has
    /// been dropped.
    pub async fn next(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;
