//! # Status Management
//!
//! Builds ManagedServiceAccount status and writes it back to the hub.

use crate::constants::{
    CONDITION_SECRET_CREATED, CONDITION_TOKEN_REPORTED, REASON_SECRET_CREATED,
    REASON_SECRET_CREATE_FAILED, REASON_TOKEN_REPORTED,
};
use crate::crd::{Condition, ManagedServiceAccount, ManagedServiceAccountStatus, SecretRef};
use crate::provider::{ClientError, DeclarationStore};
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct StatusReporter {
    declarations: Arc<dyn DeclarationStore>,
}

impl StatusReporter {
    pub fn new(declarations: Arc<dyn DeclarationStore>) -> Self {
        Self { declarations }
    }

    /// Write `status` unless it equals what the declaration already carries.
    /// Returns whether a write happened.
    pub async fn report(
        &self,
        declaration: &ManagedServiceAccount,
        status: &ManagedServiceAccountStatus,
    ) -> Result<bool, ClientError> {
        let observed = declaration.status.clone().unwrap_or_default();
        if observed == *status {
            debug!(
                "Skipping status update for {}/{} - status unchanged",
                declaration.namespace().unwrap_or_default(),
                declaration.name_any()
            );
            return Ok(false);
        }

        self.declarations.update_status(declaration, status).await?;
        Ok(true)
    }
}

pub fn mark_token_reported(status: &mut ManagedServiceAccountStatus, now: DateTime<Utc>) {
    status.set_condition(
        Condition::new(CONDITION_TOKEN_REPORTED, true, REASON_TOKEN_REPORTED, ""),
        now,
    );
}

pub fn mark_token_failed(
    status: &mut ManagedServiceAccountStatus,
    reason: &str,
    message: impl Into<String>,
    now: DateTime<Utc>,
) {
    status.set_condition(
        Condition::new(CONDITION_TOKEN_REPORTED, false, reason, message),
        now,
    );
}

pub fn mark_secret_created(status: &mut ManagedServiceAccountStatus, now: DateTime<Utc>) {
    status.set_condition(
        Condition::new(CONDITION_SECRET_CREATED, true, REASON_SECRET_CREATED, ""),
        now,
    );
}

pub fn mark_secret_failed(
    status: &mut ManagedServiceAccountStatus,
    message: impl Into<String>,
    now: DateTime<Utc>,
) {
    status.set_condition(
        Condition::new(CONDITION_SECRET_CREATED, false, REASON_SECRET_CREATE_FAILED, message),
        now,
    );
}

/// Point the status at the freshly written token
pub fn record_refresh(
    status: &mut ManagedServiceAccountStatus,
    secret_name: &str,
    refreshed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) {
    status.token_secret_ref = Some(SecretRef {
        name: secret_name.to_string(),
        last_refresh_timestamp: refreshed_at.to_rfc3339(),
    });
    status.expiration_timestamp = Some(expires_at.to_rfc3339());
}
