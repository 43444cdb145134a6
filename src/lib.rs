//! # Managed ServiceAccount Agent
//!
//! A Kubernetes agent that keeps spoke ServiceAccount tokens projected into
//! hub Secrets for every `ManagedServiceAccount` declared for its cluster.
//!
//! ## Overview
//!
//! For each `ManagedServiceAccount` in the hub cluster namespace the agent:
//!
//! 1. **Ensures the ServiceAccount** - creates it in the spoke namespace, marked as agent-owned
//! 2. **Validates the stored token** - asks TokenReview whether the hub Secret's token is still accepted
//! 3. **Rotates proactively** - requests a new token once 80% of the current one's lifetime has elapsed
//! 4. **Projects the token** - writes `token` and `ca.crt` into the hub Secret, preserving foreign metadata
//! 5. **Reports status** - `TokenReported` and `SecretCreated` conditions plus expiration on the resource
//! 6. **Cleans up** - deletes the agent-owned ServiceAccount once the declaration is gone
//!
//! ## Features
//!
//! - **Fail-closed validation**: an unverifiable token is rotated, never trusted
//! - **Optimistic writes**: conflicting writers surface as errors and the whole pass is retried
//! - **Prometheus metrics**: reconciliation, token and ServiceAccount counters
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;

pub use crd::{ManagedServiceAccount, ManagedServiceAccountSpec, ManagedServiceAccountStatus};
