//! # Watch Loop
//!
//! Runs the ManagedServiceAccount controller next to a deletion watcher.
//!
//! The controller only reconciles objects that exist. Deleted declarations are
//! picked up by a plain watcher, which runs the same reconcile for the deleted
//! key so the not-found cleanup happens.

use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::ManagedServiceAccount;
use crate::observability;
use crate::provider::IdentityKey;
use crate::runtime::error_policy::handle_reconciliation_error;
use anyhow::Result;
use futures::{pin_mut, StreamExt};
use kube::Api;
use kube_runtime::watcher::{self, watcher};
use kube_runtime::{Controller, WatchStreamExt};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Attempts at cleaning up after a deleted declaration
const CLEANUP_ATTEMPTS: u32 = 5;

pub async fn run_watch_loop(
    declarations: Api<ManagedServiceAccount>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    let controller = Controller::new(declarations.clone(), watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(
                    "Reconciled {}/{}",
                    object.namespace.as_deref().unwrap_or_default(),
                    object.name
                ),
                Err(e) => debug!("Controller reported: {}", e),
            }
        });

    let deletions = watch_deletions(declarations, reconciler);

    tokio::select! {
        () = controller => info!("Controller stopped"),
        () = deletions => warn!("ManagedServiceAccount deletion watch ended"),
    }

    server_state.is_ready.store(false, Ordering::Relaxed);
    Ok(())
}

async fn watch_deletions(declarations: Api<ManagedServiceAccount>, reconciler: Arc<Reconciler>) {
    let stream = watcher(declarations, watcher::Config::default()).default_backoff();
    pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Delete(msa)) => {
                let Some(key) = IdentityKey::from_resource(&msa) else {
                    continue;
                };
                info!("ManagedServiceAccount {} was deleted", key);
                if let Ok(mut states) = reconciler.backoff_states.lock() {
                    states.remove(&key.to_string());
                }
                clean_up_deleted(&reconciler, &key).await;
            }
            Ok(_) => {}
            Err(e) => warn!("Error watching ManagedServiceAccount deletions: {}", e),
        }
    }
}

/// Run the not-found branch for `key`, retrying transient failures
async fn clean_up_deleted(reconciler: &Reconciler, key: &IdentityKey) {
    let mut backoff = FibonacciBackoff::new(reconciler.backoff_min_secs, reconciler.backoff_max_secs);

    for attempt in 1..=CLEANUP_ATTEMPTS {
        observability::metrics::increment_reconciliations();
        match reconciler.tokens.reconcile(key).await {
            Ok(_) => return,
            Err(e) => {
                observability::metrics::increment_reconciliation_errors();
                if attempt == CLEANUP_ATTEMPTS {
                    error!(
                        "Giving up cleanup for deleted ManagedServiceAccount {} after {} attempts: {}",
                        key, attempt, e
                    );
                    return;
                }
                let delay = backoff.next_backoff_seconds();
                warn!(
                    "Cleanup for deleted ManagedServiceAccount {} failed (attempt {}), retrying in {}s: {}",
                    key, attempt, delay, e
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }
        }
    }
}
