//! # Agent Configuration
//!
//! Agent configuration loaded from environment variables.
//!
//! Optional settings have defaults. Values that fail to parse fall back to the
//! default. `CLUSTER_NAME` and `HUB_KUBECONFIG` are required.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

/// Load configuration from environment variables with defaults
pub fn load_config() -> Result<(ControllerConfig, ServerConfig), ConfigError> {
    Ok((ControllerConfig::from_env()?, ServerConfig::from_env()))
}

/// Read a variable through `lookup` and parse it, or return `default`
pub(crate) fn var_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
