//! # Controller
//!
//! Reconciliation logic plus the pieces the runtime wires around it.

pub mod backoff;
pub mod reconciler;
pub mod server;
