// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /v1/events`: an SSE bridge over the engine event bus.
//!
//! Subscribes to the engine's `broadcast::Sender` and forwards each message
//! to a connected client as an axum SSE stream using the `data: <json>\n\n`
//! wire format. The first frame is always `init`, backfilled from an
//! `AgentSystem` snapshot: a late subscriber must see a snapshot before the
//! live feed, with no replay of past events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures_util::stream::{self, Stream};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use cohort_engine::agent_system::{AgentSystem, ResolveStrategy};
use cohort_engine::event::EngineEvent;

use crate::transport::state::AppState;

/// Reshapes the `#[serde(tag = "type")]` flat encoding of an [`EngineEvent`]
/// into `{"type", "payload", "timestamp"}`: everything but `type` is nested
/// under `payload`.
fn stamped_payload(event: &EngineEvent) -> serde_json::Value {
    let flat = serde_json::to_value(event).unwrap_or_else(|_| serde_json::json!({}));
    let mut payload = match flat {
        serde_json::Value::Object(obj) => obj,
        _ => serde_json::Map::new(),
    };
    let ty = payload.remove("type").unwrap_or(serde_json::json!(event.kind()));
    serde_json::json!({
        "type": ty,
        "payload": payload,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

fn frame(event: &EngineEvent) -> Event {
    Event::default().data(stamped_payload(event).to_string())
}

async fn init_event(system: &Arc<AgentSystem>) -> EngineEvent {
    let cron = system
        .list_agents()
        .await
        .iter()
        .filter(|(_, descriptor, ..)| matches!(descriptor, cohort_engine::descriptor::AgentDescriptor::Cron { .. }))
        .count();
    let status = if system.resolve_agent_id(ResolveStrategy::Heartbeat).await.is_some() {
        "running"
    } else {
        "idle"
    };
    EngineEvent::Init { status: status.to_owned(), cron }
}

pub async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = init_event(&state.system).await;
    let receiver = state.system.event_bus().subscribe();
    let live = BroadcastStream::new(receiver).filter_map(|res| res.ok());

    let stream = stream::once(async move { init }).chain(live).map(|event| Ok(frame(&event)));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
