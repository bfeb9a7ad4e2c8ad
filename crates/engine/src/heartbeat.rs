// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat/cron façade (§4.8): background tasks that periodically feed
//! `heartbeat`/`cron` items into the [`crate::agent_system::AgentSystem`].
//!
//! One spawned task per timer, ticking on a `tokio::time::interval` with
//! `MissedTickBehavior::Skip`, snapshotting shared state before acting on it
//! and stopping on a shared cancellation signal.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agent_system::AgentSystem;
use crate::event::{EngineEvent, RoutingContext};
use crate::message::Message;

/// A source of cron task ids to tick. Cron-expression parsing itself is an
/// external concern (spec non-goal); this trait only answers "which task ids
/// are due right now".
pub trait CronSource: Send + Sync {
    /// Task ids due to run at this tick.
    fn due_tasks(&self) -> Vec<String>;
}

/// A `CronSource` with no tasks, for deployments that don't use cron.
pub struct NoCronTasks;

impl CronSource for NoCronTasks {
    fn due_tasks(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Spawn the singleton heartbeat ticker. Posts a `heartbeat`-sourced message
/// to the AgentSystem every `interval`, until `shutdown` is cancelled.
pub fn spawn_heartbeat(system: Arc<AgentSystem>, interval: Duration, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let context = RoutingContext { source: "heartbeat".into(), ..Default::default() };
            system.schedule_message("heartbeat", Message::user_text("tick"), context).await;
        }
    });
}

/// Spawn the cron ticker. On every tick, asks `source` which task ids are
/// due and schedules one `cron`-sourced message per task id, emitting
/// `cron.task.ran` for each.
pub fn spawn_cron(
    system: Arc<AgentSystem>,
    source: Arc<dyn CronSource>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            for task_id in source.due_tasks() {
                let context = RoutingContext {
                    source: "cron".into(),
                    task_id: Some(task_id.clone()),
                    ..Default::default()
                };
                system.schedule_message("cron", Message::user_text("run"), context).await;
                system.event_bus().emit(EngineEvent::CronTaskRan { task_id });
            }
        }
    });
}

/// Register a new cron task and announce it on the event bus. Scheduling
/// is driven entirely by the next `due_tasks()` tick; this only exists so
/// callers have a single place to emit `cron.task.added` when a task is
/// first registered with whatever external `CronSource` they provide.
pub fn announce_cron_task_added(system: &AgentSystem, task_id: impl Into<String>) {
    let task_id = task_id.into();
    if task_id.is_empty() {
        warn!("announce_cron_task_added called with an empty task id");
        return;
    }
    system.event_bus().emit(EngineEvent::CronTaskAdded { task_id });
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
