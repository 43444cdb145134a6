//! # Observability
//!
//! Prometheus metrics for the agent.

pub mod metrics;
