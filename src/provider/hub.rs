//! # Hub Clients
//!
//! ManagedServiceAccount and token Secret access on the hub cluster.
//!
//! Declarations are read straight from the API server, so a delete event is
//! always followed by a not-found read. Writes carry the resourceVersion that
//! was read, which turns concurrent modification into a 409 conflict.

use super::error::is_not_found;
use super::{ClientError, CredentialRecord, CredentialRecordStore, DeclarationStore, IdentityKey};
use crate::constants::FIELD_MANAGER;
use crate::crd::{ManagedServiceAccount, ManagedServiceAccountStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

/// ManagedServiceAccount store on the hub
#[derive(Clone)]
pub struct HubDeclarationStore {
    client: Client,
}

impl std::fmt::Debug for HubDeclarationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubDeclarationStore").finish_non_exhaustive()
    }
}

impl HubDeclarationStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeclarationStore for HubDeclarationStore {
    async fn get(&self, key: &IdentityKey) -> Result<Option<ManagedServiceAccount>, ClientError> {
        let api: Api<ManagedServiceAccount> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.get_opt(&key.name).await?)
    }

    async fn update_status(
        &self,
        declaration: &ManagedServiceAccount,
        status: &ManagedServiceAccountStatus,
    ) -> Result<(), ClientError> {
        let name = declaration.name_any();
        let namespace = declaration.namespace().unwrap_or_default();
        let api: Api<ManagedServiceAccount> = Api::namespaced(self.client.clone(), &namespace);

        let mut patch = serde_json::json!({ "status": status });
        if let Some(resource_version) = declaration.resource_version() {
            patch["metadata"] = serde_json::json!({ "resourceVersion": resource_version });
        }

        match api
            .patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                // Deleted while we were reconciling; the next trigger runs cleanup
                debug!(
                    "ManagedServiceAccount {}/{} was deleted during reconciliation, skipping status update",
                    namespace, name
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Token Secret store on the hub
#[derive(Clone)]
pub struct HubSecretStore {
    client: Client,
}

impl std::fmt::Debug for HubSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSecretStore").finish_non_exhaustive()
    }
}

impl HubSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialRecordStore for HubSecretStore {
    async fn get(&self, key: &IdentityKey) -> Result<Option<CredentialRecord>, ClientError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &key.namespace);
        let secret = api.get_opt(&key.name).await?;
        Ok(secret.map(record_from_secret))
    }

    async fn upsert(&self, record: &CredentialRecord) -> Result<(), ClientError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &record.namespace);
        let secret = secret_from_record(record);

        if record.resource_version.is_none() {
            api.create(&PostParams::default(), &secret).await?;
        } else {
            // Merge patch leaves fields we do not model (finalizers, other data keys) alone
            api.patch(&record.name, &PatchParams::default(), &Patch::Merge(&secret))
                .await?;
        }
        Ok(())
    }
}

pub(crate) fn record_from_secret(secret: Secret) -> CredentialRecord {
    let metadata = secret.metadata;
    CredentialRecord {
        namespace: metadata.namespace.unwrap_or_default(),
        name: metadata.name.unwrap_or_default(),
        data: secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect(),
        labels: metadata.labels.unwrap_or_default(),
        annotations: metadata.annotations.unwrap_or_default(),
        owner_references: metadata.owner_references.unwrap_or_default(),
        resource_version: metadata.resource_version,
    }
}

pub(crate) fn secret_from_record(record: &CredentialRecord) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(record.name.clone()),
            namespace: Some(record.namespace.clone()),
            labels: Some(record.labels.clone()),
            annotations: Some(record.annotations.clone()),
            owner_references: (!record.owner_references.is_empty())
                .then(|| record.owner_references.clone()),
            resource_version: record.resource_version.clone(),
            ..Default::default()
        },
        data: Some(
            record
                .data
                .iter()
                .map(|(k, v)| (k.clone(), ByteString(v.clone())))
                .collect(),
        ),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_secret_record_conversion_keeps_metadata() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("msa1".to_string()),
                namespace: Some("cluster1".to_string()),
                labels: Some(BTreeMap::from([("foo".to_string(), "bar".to_string())])),
                annotations: Some(BTreeMap::from([("note".to_string(), "x".to_string())])),
                resource_version: Some("42".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([
                ("token".to_string(), ByteString(b"t1".to_vec())),
                ("extra".to_string(), ByteString(b"e".to_vec())),
            ])),
            ..Default::default()
        };

        let record = record_from_secret(secret);
        assert_eq!(record.name, "msa1");
        assert_eq!(record.namespace, "cluster1");
        assert_eq!(record.token(), Some("t1"));
        assert_eq!(record.labels.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(record.resource_version.as_deref(), Some("42"));

        let back = secret_from_record(&record);
        let data = back.data.unwrap();
        assert_eq!(data.get("extra").map(|b| b.0.as_slice()), Some(b"e".as_slice()));
        assert_eq!(back.metadata.annotations.unwrap().get("note").map(String::as_str), Some("x"));
        assert_eq!(back.metadata.resource_version.as_deref(), Some("42"));
        assert!(back.metadata.owner_references.is_none());
    }
}
