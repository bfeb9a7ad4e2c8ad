// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// The agent runtime engine: per-agent inboxes, durable session storage, and
/// a small reference connector/provider/tool set for local development.
#[derive(Debug, Parser)]
#[command(name = "cohort", version, about)]
pub struct Config {
    /// HTTP port to listen on.
    #[arg(long, env = "COHORT_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "COHORT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Health-check-only HTTP port. When unset, health endpoints are served
    /// on the main port instead of a separate listener.
    #[arg(long, env = "COHORT_HEALTH_PORT")]
    pub health_port: Option<u16>,

    /// Directory under which `agents/<agentId>/...` session state is stored.
    #[arg(long, env = "COHORT_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Bearer token for API authentication. When unset, the API is open.
    #[arg(long, env = "COHORT_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Inference provider kind to register (currently only "echo", the
    /// reference provider used for local development and integration tests).
    #[arg(long, env = "COHORT_PROVIDER", default_value = "echo")]
    pub provider: String,

    /// Model identifier passed through to the configured provider.
    #[arg(long, env = "COHORT_MODEL", default_value = "echo-1")]
    pub model: String,

    /// Heartbeat tick interval in seconds.
    #[arg(long, env = "COHORT_HEARTBEAT_INTERVAL", default_value = "300")]
    pub heartbeat_interval_secs: u64,

    /// Cron poll interval in seconds.
    #[arg(long, env = "COHORT_CRON_INTERVAL", default_value = "60")]
    pub cron_interval_secs: u64,

    /// Grace period in seconds for in-flight turns to finish during shutdown.
    #[arg(long, env = "COHORT_SHUTDOWN_GRACE", default_value = "30")]
    pub shutdown_grace_secs: u64,

    /// Log format (json or text).
    #[arg(long, env = "COHORT_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "COHORT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("--port must be nonzero");
        }
        if matches!(self.health_port, Some(0)) {
            anyhow::bail!("--health-port must be nonzero");
        }
        if self.health_port == Some(self.port) {
            anyhow::bail!("--health-port must differ from --port");
        }
        self.log_format_enum()?;
        self.provider_enum()?;
        Ok(())
    }

    pub fn log_format_enum(&self) -> anyhow::Result<LogFormat> {
        match self.log_format.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            other => anyhow::bail!("invalid log format: {other}"),
        }
    }

    pub fn provider_enum(&self) -> anyhow::Result<ProviderKind> {
        match self.provider.to_lowercase().as_str() {
            "echo" => Ok(ProviderKind::Echo),
            other => anyhow::bail!("invalid provider: {other}"),
        }
    }
}

/// Supported log formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Registered reference inference providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Echo,
}

impl ProviderKind {
    pub fn as_id(self) -> &'static str {
        match self {
            Self::Echo => "echo",
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
