// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level runner: builds the engine's collaborators, wires background
//! tasks and transports, and runs until shutdown. Split into a `prepare`
//! step and a `run` step: no PTY, no backend adapters, no credential broker
//! — just the agent runtime's own collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cohort_engine::agent::AgentDeps;
use cohort_engine::agent_system::AgentSystem;
use cohort_engine::connector::ConnectorRegistry;
use cohort_engine::event_bus::EventBus;
use cohort_engine::heartbeat::{self, NoCronTasks};
use cohort_engine::inference::{InferenceRouter, ProviderConfig};
use cohort_engine::store::SessionStore;
use cohort_engine::tools::ToolResolver;

use crate::config::{Config, LogFormat};
use crate::connectors::stdio;
use crate::toolset::CurrentTimeTool;
use crate::transport::{build_health_router, build_router, AppState};

/// Fixed identity for the single stdin REPL session: the whole process'
/// lifetime maps to one user/channel pair, hence one agent.
const STDIN_USER_ID: &str = "local";
const STDIN_CHANNEL_ID: &str = "stdio";

/// Initialize tracing from config. Uses `try_init` so it's safe to call more
/// than once (e.g. across integration tests in the same process).
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let result = match config.log_format_enum().unwrap_or(LogFormat::Json) {
        LogFormat::Json => fmt::fmt().with_env_filter(filter).json().try_init(),
        LogFormat::Text => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

async fn build_system(config: &Config) -> anyhow::Result<Arc<AgentSystem>> {
    let mut connectors = ConnectorRegistry::new();
    connectors.register(Arc::new(stdio::StdioConnector));

    let mut tools = ToolResolver::new();
    tools.register(Arc::new(CurrentTimeTool));

    let inference = InferenceRouter::new(vec![Arc::new(crate::providers::EchoProvider)]);
    inference
        .update_providers(vec![ProviderConfig {
            id: config.provider_enum()?.as_id().to_owned(),
            model: config.model.clone(),
            options: serde_json::json!({}),
        }])
        .await;

    let deps = AgentDeps {
        store: Arc::new(SessionStore::new(config.data_dir.clone())),
        event_bus: Arc::new(EventBus::new()),
        connectors: Arc::new(connectors),
        inference: Arc::new(inference),
        tools: Arc::new(tools),
    };
    Ok(Arc::new(AgentSystem::new(deps)))
}

/// Run the agent runtime to completion (until a shutdown signal arrives).
pub async fn run(config: Config) -> anyhow::Result<()> {
    init_tracing(&config);
    config.validate()?;

    let system = build_system(&config).await?;
    system.load().await;
    system.start().await;

    let shutdown = CancellationToken::new();

    heartbeat::spawn_heartbeat(Arc::clone(&system), Duration::from_secs(config.heartbeat_interval_secs), shutdown.clone());
    heartbeat::spawn_cron(
        Arc::clone(&system),
        Arc::new(NoCronTasks),
        Duration::from_secs(config.cron_interval_secs),
        shutdown.clone(),
    );

    tokio::spawn(stdio::spawn_ingest(Arc::clone(&system), STDIN_USER_ID.to_owned(), STDIN_CHANNEL_ID.to_owned()));

    let state = AppState { system: Arc::clone(&system), auth_token: config.auth_token.clone() };

    if let Some(health_port) = config.health_port {
        let addr = format!("{}:{}", config.host, health_port);
        let listener = TcpListener::bind(&addr).await?;
        info!("health probe listening on {addr}");
        let router = build_health_router(state.clone());
        let sd = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(sd.cancelled_owned()).await {
                error!("health server error: {e}");
            }
        });
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP listening on {addr}");
    let router = build_router(state);
    let sd = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(sd.cancelled_owned()).await {
            error!("HTTP server error: {e}");
        }
    });

    let sd = shutdown.clone();
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { info!("received SIGINT"); }
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => { info!("received SIGTERM"); }
        }
        sd.cancel();
    });

    let _ = server.await;
    system.shutdown(Duration::from_secs(config.shutdown_grace_secs)).await;
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
