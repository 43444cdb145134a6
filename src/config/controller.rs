//! # Controller Configuration
//!
//! Cluster, namespace and token settings loaded from environment variables.

use super::{env_lookup, var_or_default, ConfigError};
use crate::constants::{
    DEFAULT_ERROR_BACKOFF_MAX_SECS, DEFAULT_ERROR_BACKOFF_MIN_SECS, DEFAULT_REFRESH_BUFFER_SECS,
    DEFAULT_REFRESH_PERCENT, DEFAULT_SPOKE_NAMESPACE,
};
use crate::controller::reconciler::RefreshScheduler;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Hub namespace holding this cluster's ManagedServiceAccounts
    pub cluster_name: String,
    /// Spoke namespace where ServiceAccounts are created
    pub spoke_namespace: String,
    pub hub_kubeconfig: PathBuf,
    /// PEM bundle written as `ca.crt`; derived from the spoke client when unset
    pub spoke_ca_file: Option<PathBuf>,
    pub token_audiences: Vec<String>,
    pub refresh_percent: u8,
    pub refresh_buffer_secs: u64,
    pub error_backoff_min_secs: u64,
    pub error_backoff_max_secs: u64,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let refresh_percent = var_or_default(&lookup, "REFRESH_PERCENT", DEFAULT_REFRESH_PERCENT);
        let refresh_percent = if (1..=100).contains(&refresh_percent) {
            refresh_percent
        } else {
            DEFAULT_REFRESH_PERCENT
        };

        Ok(Self {
            cluster_name: required("CLUSTER_NAME")?,
            hub_kubeconfig: PathBuf::from(required("HUB_KUBECONFIG")?),
            spoke_namespace: lookup("SPOKE_NAMESPACE")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SPOKE_NAMESPACE.to_string()),
            spoke_ca_file: lookup("SPOKE_CA_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            token_audiences: lookup("TOKEN_AUDIENCES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            refresh_percent,
            refresh_buffer_secs: var_or_default(
                &lookup,
                "REFRESH_BUFFER_SECS",
                DEFAULT_REFRESH_BUFFER_SECS,
            ),
            error_backoff_min_secs: var_or_default(
                &lookup,
                "ERROR_BACKOFF_MIN_SECS",
                DEFAULT_ERROR_BACKOFF_MIN_SECS,
            ),
            error_backoff_max_secs: var_or_default(
                &lookup,
                "ERROR_BACKOFF_MAX_SECS",
                DEFAULT_ERROR_BACKOFF_MAX_SECS,
            ),
        })
    }

    pub fn refresh_scheduler(&self) -> RefreshScheduler {
        RefreshScheduler::new(
            self.refresh_percent,
            Duration::from_secs(self.refresh_buffer_secs),
        )
    }
}
