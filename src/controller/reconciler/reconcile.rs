//! # Reconciliation
//!
//! One pass over a ManagedServiceAccount:
//!
//! 1. Fetch the declaration. When it is gone, clean up the spoke ServiceAccount
//!    we created for it and stop.
//! 2. Ensure the spoke ServiceAccount exists.
//! 3. Load the hub token Secret and check its token against TokenReview.
//! 4. Keep a valid token until 80% of its lifetime has elapsed.
//! 5. Otherwise request a new token and write it to the hub Secret.
//!
//! Status is built up in memory during the pass and written once at the end,
//! also when the pass fails.

use super::principal::{CleanupOutcome, PrincipalManager};
use super::schedule::RefreshScheduler;
use super::secret::CredentialStore;
use super::status::{self, StatusReporter};
use super::token::{TokenIssuer, TokenValidator};
use super::types::{Reconciler, ReconcilerError};
use super::validation::parse_go_duration;
use crate::constants::{
    REASON_INVALID_ROTATION_VALIDITY, REASON_SERVICE_ACCOUNT_NOT_READY,
    REASON_TOKEN_REPORT_FAILED,
};
use crate::crd::{ManagedServiceAccount, ManagedServiceAccountStatus};
use crate::observability;
use crate::provider::{
    CredentialRecord, CredentialRecordStore, DeclarationStore, IdentityKey, SpokeIdentityApi,
};
use chrono::{DateTime, Utc};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

/// Token reconciler for a single spoke execution namespace
#[derive(Clone)]
pub struct TokenReconciler {
    declarations: Arc<dyn DeclarationStore>,
    spoke: Arc<dyn SpokeIdentityApi>,
    principals: PrincipalManager,
    issuer: TokenIssuer,
    validator: TokenValidator,
    credentials: CredentialStore,
    reporter: StatusReporter,
    scheduler: RefreshScheduler,
    spoke_namespace: String,
}

impl TokenReconciler {
    pub fn new(
        declarations: Arc<dyn DeclarationStore>,
        spoke: Arc<dyn SpokeIdentityApi>,
        records: Arc<dyn CredentialRecordStore>,
        spoke_namespace: impl Into<String>,
        scheduler: RefreshScheduler,
    ) -> Self {
        Self {
            principals: PrincipalManager::new(Arc::clone(&spoke)),
            issuer: TokenIssuer::new(Arc::clone(&spoke)),
            validator: TokenValidator::new(Arc::clone(&spoke)),
            credentials: CredentialStore::new(records),
            reporter: StatusReporter::new(Arc::clone(&declarations)),
            declarations,
            spoke,
            scheduler,
            spoke_namespace: spoke_namespace.into(),
        }
    }

    /// Reconcile `key` against the current time.
    /// `Ok(Some(d))` asks to be called again after `d`; `Ok(None)` means nothing is pending.
    pub async fn reconcile(&self, key: &IdentityKey) -> Result<Option<Duration>, ReconcilerError> {
        self.reconcile_at(key, Utc::now()).await
    }

    pub async fn reconcile_at(
        &self,
        key: &IdentityKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Duration>, ReconcilerError> {
        let declaration = match self
            .declarations
            .get(key)
            .await
            .map_err(ReconcilerError::GetDeclaration)?
        {
            Some(declaration) => declaration,
            None => {
                let outcome = self
                    .principals
                    .cleanup(key, &self.spoke_namespace)
                    .await
                    .map_err(ReconcilerError::Cleanup)?;
                debug!("ManagedServiceAccount {} not found, cleanup: {:?}", key, outcome);
                if outcome == CleanupOutcome::Deleted {
                    info!("Cleaned up ServiceAccount for deleted ManagedServiceAccount {}", key);
                }
                return Ok(None);
            }
        };

        let mut status = declaration.status.clone().unwrap_or_default();
        let result = self.sync(key, &declaration, &mut status, now).await;
        if let Err(e) = &result {
            mark_failure(&mut status, e, now);
        }

        match (self.reporter.report(&declaration, &status).await, result) {
            (Ok(_), result) => result,
            (Err(e), Ok(_)) => Err(ReconcilerError::UpdateStatus(e)),
            (Err(e), Err(sync_error)) => {
                warn!("Failed to report status for {} after error: {}", key, e);
                Err(sync_error)
            }
        }
    }

    async fn sync(
        &self,
        key: &IdentityKey,
        declaration: &ManagedServiceAccount,
        status: &mut ManagedServiceAccountStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Duration>, ReconcilerError> {
        let principal = self
            .principals
            .ensure(key, &self.spoke_namespace)
            .await
            .map_err(ReconcilerError::EnsurePrincipal)?;

        let existing = self
            .credentials
            .load(key)
            .await
            .map_err(ReconcilerError::GetRecord)?;
        let token_valid = match &existing {
            Some(record) => self.check_record(record).await,
            None => false,
        };

        let trust_anchor = self.spoke.trust_anchor();
        let anchor_current = existing
            .as_ref()
            .and_then(CredentialRecord::trust_anchor)
            .is_some_and(|ca| ca == trust_anchor.as_slice());

        let check = status
            .expiration()
            .zip(status.last_refresh())
            .map(|(expiration, last_refresh)| self.scheduler.evaluate(now, expiration, last_refresh));

        if let Some(check) = check.filter(|c| !c.due) {
            if token_valid && anchor_current {
                debug!(
                    "Token for {} is valid, next check in {}s",
                    key,
                    check.requeue_after.as_secs()
                );
                status::mark_token_reported(status, now);
                status::mark_secret_created(status, now);
                return Ok(Some(check.requeue_after));
            }
        }

        let validity = parse_go_duration(&declaration.spec.rotation.validity)
            .map_err(ReconcilerError::InvalidValidity)?;
        let credential = self
            .issuer
            .request(&principal, validity)
            .await
            .map_err(ReconcilerError::SyncToken)?;

        self.credentials
            .persist(
                declaration,
                key,
                &self.spoke_namespace,
                &credential.token,
                &trust_anchor,
            )
            .await
            .map_err(ReconcilerError::PersistRecord)?;
        info!(
            "Refreshed token for {}, expires at {}",
            key,
            credential.expires_at.to_rfc3339()
        );

        status::record_refresh(status, &key.name, now, credential.expires_at);
        status::mark_token_reported(status, now);
        status::mark_secret_created(status, now);

        Ok(Some(
            self.scheduler.next_check(now, credential.expires_at, now),
        ))
    }

    /// A record is only trusted when it was issued for the current namespace
    /// and TokenReview still accepts its token
    async fn check_record(&self, record: &CredentialRecord) -> bool {
        let Some(token) = record.token() else {
            return false;
        };
        match record.issued_namespace() {
            Some(issued) if issued != self.spoke_namespace => {
                info!(
                    "Token in {}/{} was issued for namespace {}, now {}; refreshing",
                    record.namespace, record.name, issued, self.spoke_namespace
                );
                false
            }
            _ => self.validator.is_valid(token, &self.spoke_namespace).await,
        }
    }
}

/// Record a failed pass in the status so it never shows a stale success
fn mark_failure(status: &mut ManagedServiceAccountStatus, error: &ReconcilerError, now: DateTime<Utc>) {
    let message = error.to_string();
    match error {
        ReconcilerError::InvalidValidity(_) => {
            status::mark_token_failed(status, REASON_INVALID_ROTATION_VALIDITY, message, now);
        }
        ReconcilerError::EnsurePrincipal(_) => {
            status::mark_token_failed(status, REASON_SERVICE_ACCOUNT_NOT_READY, message, now);
        }
        ReconcilerError::PersistRecord(_) => {
            status::mark_secret_failed(status, message.clone(), now);
            status::mark_token_failed(status, REASON_TOKEN_REPORT_FAILED, message, now);
        }
        ReconcilerError::GetRecord(_) | ReconcilerError::SyncToken(_) => {
            status::mark_token_failed(status, REASON_TOKEN_REPORT_FAILED, message, now);
        }
        ReconcilerError::GetDeclaration(_)
        | ReconcilerError::Cleanup(_)
        | ReconcilerError::UpdateStatus(_) => {}
    }
}

/// Controller entry point for a watched ManagedServiceAccount
pub async fn reconcile(
    msa: Arc<ManagedServiceAccount>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let Some(key) = IdentityKey::from_resource(&msa) else {
        warn!("Skipping ManagedServiceAccount without namespace or name");
        return Ok(Action::await_change());
    };

    let span = tracing::info_span!(
        "reconcile",
        resource.namespace = %key.namespace,
        resource.name = %key.name
    );
    let start = Instant::now();
    observability::metrics::increment_reconciliations();

    let result = ctx.tokens.reconcile(&key).instrument(span).await;
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    let requeue_after = result?;

    // A clean pass resets the error backoff for this resource
    if let Ok(mut states) = ctx.backoff_states.lock() {
        if let Some(state) = states.get_mut(&key.to_string()) {
            state.reset();
        }
    }

    Ok(match requeue_after {
        Some(delay) => {
            observability::metrics::increment_requeues_total("token-refresh");
            Action::requeue(delay)
        }
        None => Action::await_change(),
    })
}
