//! # Error Policy
//!
//! Requeue decisions for failed reconciliations.

use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::ManagedServiceAccount;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Requeue delay after losing an optimistic write
pub const CONFLICT_REQUEUE: Duration = Duration::from_secs(1);

/// Handle reconciliation errors with per-resource Fibonacci backoff
///
/// Each ManagedServiceAccount keeps its own backoff state, so one failing
/// resource never slows down the others. Conflicts are retried right away
/// without advancing the backoff.
pub fn handle_reconciliation_error(
    obj: Arc<ManagedServiceAccount>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    observability::metrics::increment_reconciliation_errors();

    if error.is_conflict() {
        info!(
            resource.namespace = %namespace,
            resource.name = %name,
            "Conflict while reconciling, retrying: {}",
            error
        );
        observability::metrics::increment_requeues_total("conflict");
        return Action::requeue(CONFLICT_REQUEUE);
    }

    error!(
        resource.namespace = %namespace,
        resource.name = %name,
        "Reconciliation error: {}",
        error
    );

    let resource_key = format!("{}/{}", namespace, name);
    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(resource_key)
                .or_insert_with(|| BackoffState::new(ctx.backoff_min_secs, ctx.backoff_max_secs));
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using minimum backoff", e);
            (ctx.backoff_min_secs, 0)
        }
    };

    info!(
        "Retrying {}/{} in {}s (error count: {})",
        namespace, name, backoff_seconds, error_count
    );
    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}
