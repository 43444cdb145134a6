//! # Server Configuration
//!
//! HTTP server settings loaded from environment variables.

use super::{env_lookup, var_or_default};
use crate::constants::{
    DEFAULT_METRICS_PORT, DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
};

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP server port for metrics and health probes
    pub metrics_port: u16,
    /// How long to wait for the server to be ready before giving up (seconds)
    pub startup_timeout_secs: u64,
    /// How often to check if the server is ready during startup (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            metrics_port: var_or_default(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            startup_timeout_secs: var_or_default(
                &lookup,
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            poll_interval_ms: var_or_default(
                &lookup,
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
        }
    }
}
