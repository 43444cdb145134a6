//! # Principal Management
//!
//! Ensures the spoke ServiceAccount behind a ManagedServiceAccount exists, and
//! removes it again once the declaration is gone. Only accounts carrying the
//! ownership marker are ever deleted.

use crate::constants::LABEL_IS_MANAGED_SERVICEACCOUNT;
use crate::observability;
use crate::provider::{ClientError, IdentityKey, Principal, SpokeIdentityApi};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PrincipalError {
    #[error("failed to get service-account {namespace}/{name}: {source}")]
    Get {
        namespace: String,
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to create service-account {namespace}/{name}: {source}")]
    Create {
        namespace: String,
        name: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to delete service-account {namespace}/{name}: {source}")]
    Delete {
        namespace: String,
        name: String,
        #[source]
        source: ClientError,
    },
}

/// What cleanup found on the spoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Absent,
    /// Present without the ownership marker, left in place
    Unmanaged,
    Deleted,
}

#[derive(Clone)]
pub struct PrincipalManager {
    spoke: Arc<dyn SpokeIdentityApi>,
}

impl PrincipalManager {
    pub fn new(spoke: Arc<dyn SpokeIdentityApi>) -> Self {
        Self { spoke }
    }

    /// Return the ServiceAccount for `key`, creating it with the ownership marker
    /// if it does not exist. An existing account is returned untouched.
    pub async fn ensure(
        &self,
        key: &IdentityKey,
        namespace: &str,
    ) -> Result<Principal, PrincipalError> {
        let existing = self
            .spoke
            .get_principal(namespace, &key.name)
            .await
            .map_err(|source| PrincipalError::Get {
                namespace: namespace.to_string(),
                name: key.name.clone(),
                source,
            })?;

        if let Some(principal) = existing {
            debug!("ServiceAccount {}/{} already exists", namespace, key.name);
            return Ok(principal);
        }

        let labels = BTreeMap::from([(
            LABEL_IS_MANAGED_SERVICEACCOUNT.to_string(),
            "true".to_string(),
        )]);
        self.spoke
            .create_principal(namespace, &key.name, labels)
            .await
            .map_err(|source| PrincipalError::Create {
                namespace: namespace.to_string(),
                name: key.name.clone(),
                source,
            })?;

        info!("Created ServiceAccount {}/{}", namespace, key.name);
        observability::metrics::increment_service_accounts_created();

        Ok(Principal {
            namespace: namespace.to_string(),
            name: key.name.clone(),
            managed: true,
        })
    }

    /// Delete the ServiceAccount for `key` if, and only if, it carries the marker
    pub async fn cleanup(
        &self,
        key: &IdentityKey,
        namespace: &str,
    ) -> Result<CleanupOutcome, PrincipalError> {
        let existing = self
            .spoke
            .get_principal(namespace, &key.name)
            .await
            .map_err(|source| PrincipalError::Get {
                namespace: namespace.to_string(),
                name: key.name.clone(),
                source,
            })?;

        match existing {
            None => Ok(CleanupOutcome::Absent),
            Some(principal) if !principal.managed => {
                info!(
                    "ServiceAccount {}/{} is not managed by the agent, leaving it in place",
                    namespace, key.name
                );
                Ok(CleanupOutcome::Unmanaged)
            }
            Some(_) => {
                self.spoke
                    .delete_principal(namespace, &key.name)
                    .await
                    .map_err(|source| PrincipalError::Delete {
                        namespace: namespace.to_string(),
                        name: key.name.clone(),
                        source,
                    })?;
                info!("Deleted ServiceAccount {}/{}", namespace, key.name);
                observability::metrics::increment_service_accounts_deleted();
                Ok(CleanupOutcome::Deleted)
            }
        }
    }
}
