//! # Reconciler Types
//!
//! Error type and controller context shared by the reconciler and the runtime.

use super::principal::PrincipalError;
use super::reconcile::TokenReconciler;
use super::token::TokenError;
use super::validation::DurationError;
use crate::controller::backoff::FibonacciBackoff;
use crate::provider::ClientError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("fail to get managed serviceaccount: {0}")]
    GetDeclaration(#[source] ClientError),
    #[error("failed to clean up service-account: {0}")]
    Cleanup(#[source] PrincipalError),
    #[error("failed to ensure service-account: {0}")]
    EnsurePrincipal(#[source] PrincipalError),
    #[error("failed to get token secret: {0}")]
    GetRecord(#[source] ClientError),
    #[error("invalid rotation validity: {0}")]
    InvalidValidity(#[source] DurationError),
    #[error("failed to sync token: {0}")]
    SyncToken(#[source] TokenError),
    #[error("failed to persist token secret: {0}")]
    PersistRecord(#[source] ClientError),
    #[error("failed to update status: {0}")]
    UpdateStatus(#[source] ClientError),
}

impl ReconcilerError {
    /// True when the pass lost an optimistic write and should simply run again
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::PersistRecord(e) | Self::UpdateStatus(e) => e.is_conflict(),
            _ => false,
        }
    }
}

/// Per-resource error backoff
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.backoff.reset();
        self.error_count = 0;
    }
}

/// Controller context handed to every reconcile and error_policy call
pub struct Reconciler {
    pub tokens: TokenReconciler,
    /// Backoff state keyed by "namespace/name"
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
}

impl Reconciler {
    pub fn new(tokens: TokenReconciler, backoff_min_secs: u64, backoff_max_secs: u64) -> Self {
        Self {
            tokens,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            backoff_min_secs,
            backoff_max_secs,
        }
    }
}
