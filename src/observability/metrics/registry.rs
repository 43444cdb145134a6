//! # Metrics Registry
//!
//! Prometheus metrics registry setup and registration.

use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::LazyLock;

/// Global Prometheus metrics registry
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Register all metrics with the Prometheus registry
///
/// Prometheus metrics are Arc-backed, so the registry holds cheap clones.
pub fn register_metrics() -> prometheus::Result<()> {
    super::controller_metrics::register_controller_metrics()
}

/// Encode every registered metric in the Prometheus text format
pub fn gather_metrics() -> prometheus::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
