//! # Credential Store
//!
//! Projects an issued token and the spoke CA bundle into the hub Secret.
//!
//! The Secret is shared with other actors: labels, annotations, owner references
//! and data keys written by them are carried forward on every write. Only the
//! agent's own labels and the `token`/`ca.crt` pair are replaced, and always
//! together.

use crate::constants::{
    LABEL_IS_MANAGED_SERVICEACCOUNT, LABEL_MANAGED_SERVICEACCOUNT_NAME,
    LABEL_MANAGED_SERVICEACCOUNT_NAMESPACE, SECRET_CA_KEY, SECRET_TOKEN_KEY,
};
use crate::crd::ManagedServiceAccount;
use crate::provider::{ClientError, CredentialRecord, CredentialRecordStore, IdentityKey};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CredentialStore {
    records: Arc<dyn CredentialRecordStore>,
}

impl CredentialStore {
    pub fn new(records: Arc<dyn CredentialRecordStore>) -> Self {
        Self { records }
    }

    pub async fn load(&self, key: &IdentityKey) -> Result<Option<CredentialRecord>, ClientError> {
        self.records.get(key).await
    }

    /// Write `token` and `trust_anchor` into the Secret for `key`.
    ///
    /// The current Secret is read first so the write is based on its latest
    /// metadata and resourceVersion. A concurrent change fails with a conflict.
    pub async fn persist(
        &self,
        declaration: &ManagedServiceAccount,
        key: &IdentityKey,
        spoke_namespace: &str,
        token: &str,
        trust_anchor: &[u8],
    ) -> Result<(), ClientError> {
        let existing = self.records.get(key).await?;
        let created = existing.is_none();
        let record = merge_record(
            existing,
            key,
            declaration.controller_owner_ref(&()),
            spoke_namespace,
            token,
            trust_anchor,
        );

        self.records.upsert(&record).await?;
        debug!(
            "{} token Secret {}",
            if created { "Created" } else { "Updated" },
            key
        );
        Ok(())
    }
}

/// Build the record to write from the current one (if any)
pub fn merge_record(
    existing: Option<CredentialRecord>,
    key: &IdentityKey,
    owner: Option<OwnerReference>,
    spoke_namespace: &str,
    token: &str,
    trust_anchor: &[u8],
) -> CredentialRecord {
    let mut record = existing.unwrap_or_else(|| CredentialRecord::new(key));

    record.labels.insert(
        LABEL_IS_MANAGED_SERVICEACCOUNT.to_string(),
        "true".to_string(),
    );
    record.labels.insert(
        LABEL_MANAGED_SERVICEACCOUNT_NAME.to_string(),
        key.name.clone(),
    );
    record.labels.insert(
        LABEL_MANAGED_SERVICEACCOUNT_NAMESPACE.to_string(),
        spoke_namespace.to_string(),
    );

    record
        .data
        .insert(SECRET_TOKEN_KEY.to_string(), token.as_bytes().to_vec());
    record
        .data
        .insert(SECRET_CA_KEY.to_string(), trust_anchor.to_vec());

    if let Some(mut owner) = owner {
        if !record.owner_references.iter().any(|r| r.uid == owner.uid) {
            // The API server allows a single controller reference
            if record
                .owner_references
                .iter()
                .any(|r| r.controller == Some(true))
            {
                owner.controller = None;
            }
            record.owner_references.push(owner);
        }
    }

    record
}
