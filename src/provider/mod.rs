//! # Providers
//!
//! Capability interfaces the reconciler calls into, and their Kubernetes-backed
//! implementations:
//! - `DeclarationStore`: ManagedServiceAccount reads and status writes on the hub
//! - `SpokeIdentityApi`: ServiceAccounts, TokenRequest and TokenReview on the spoke
//! - `CredentialRecordStore`: token Secrets on the hub
//!
//! The reconciler only sees the traits, so tests can drive it with in-memory fakes.

mod error;
pub mod hub;
pub mod spoke;
mod types;

pub use error::ClientError;
pub use types::{Credential, CredentialRecord, IdentityKey, Principal};

use crate::crd::{ManagedServiceAccount, ManagedServiceAccountStatus};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::collections::BTreeMap;
use std::time::Duration;

/// Read access to declarations plus status writes
#[async_trait]
pub trait DeclarationStore: Send + Sync {
    /// Fetch a declaration. `Ok(None)` means it does not exist.
    async fn get(&self, key: &IdentityKey) -> Result<Option<ManagedServiceAccount>, ClientError>;

    /// Write the status of a previously fetched declaration.
    /// Stale writes surface as `ClientError::Conflict`.
    async fn update_status(
        &self,
        declaration: &ManagedServiceAccount,
        status: &ManagedServiceAccountStatus,
    ) -> Result<(), ClientError>;
}

/// Execution-plane identity API
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpokeIdentityApi: Send + Sync {
    /// Fetch a service account. `Ok(None)` means it does not exist.
    async fn get_principal(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Principal>, ClientError>;

    /// Create a service account carrying the given labels
    async fn create_principal(
        &self,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<(), ClientError>;

    async fn delete_principal(&self, namespace: &str, name: &str) -> Result<(), ClientError>;

    /// Request a token for the service account, bounded by `validity`
    async fn issue_token(
        &self,
        principal: &Principal,
        validity: Duration,
    ) -> Result<Credential, ClientError>;

    /// Ask the spoke API server whether it currently accepts the token
    async fn validate_token(&self, token: &str) -> Result<bool, ClientError>;

    /// CA bundle clients need to trust the spoke API server
    fn trust_anchor(&self) -> Vec<u8>;
}

/// Hub-side token Secret storage
#[async_trait]
pub trait CredentialRecordStore: Send + Sync {
    /// Fetch a record. `Ok(None)` means it does not exist.
    async fn get(&self, key: &IdentityKey) -> Result<Option<CredentialRecord>, ClientError>;

    /// Create the record when `resource_version` is `None`, otherwise replace it.
    /// Replacing a record that changed since it was read fails with `ClientError::Conflict`.
    async fn upsert(&self, record: &CredentialRecord) -> Result<(), ClientError>;
}
