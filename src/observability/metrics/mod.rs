//! # Metrics Module
//!
//! Prometheus metrics for monitoring the agent.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text encoding
//! - `controller_metrics` - Reconciliation, token and ServiceAccount metrics

pub mod controller_metrics;
pub mod registry;

pub use controller_metrics::*;
pub use registry::*;
