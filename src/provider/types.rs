//! # Provider Types
//!
//! Values exchanged between the reconciler and the hub/spoke clients.

use crate::constants::{
    LABEL_MANAGED_SERVICEACCOUNT_NAMESPACE, SECRET_CA_KEY, SECRET_TOKEN_KEY,
};
use crate::crd::ManagedServiceAccount;
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a ManagedServiceAccount (hub namespace + name).
/// The token Secret on the hub uses the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub namespace: String,
    pub name: String,
}

impl IdentityKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a hub resource, if it carries both namespace and name
    pub fn from_resource(msa: &ManagedServiceAccount) -> Option<Self> {
        let namespace = msa.namespace()?;
        let name = msa.metadata.name.clone()?;
        Some(Self { namespace, name })
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A service account on the spoke cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub namespace: String,
    pub name: String,
    /// True when the ownership marker label is present
    pub managed: bool,
}

/// A freshly issued token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Hub-side token Secret
///
/// `data` carries every key of the Secret so that writes only replace the
/// token and CA entries. Labels, annotations and owner references belong
/// partly to other actors and are carried through unchanged.
#[derive(Clone, Default, PartialEq)]
pub struct CredentialRecord {
    pub namespace: String,
    pub name: String,
    pub data: BTreeMap<String, Vec<u8>>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerReference>,
    /// Set for records read from the hub; `None` means the record must be created
    pub resource_version: Option<String>,
}

impl CredentialRecord {
    /// Empty record for a key that does not exist yet
    pub fn new(key: &IdentityKey) -> Self {
        Self {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
            ..Default::default()
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.data
            .get(SECRET_TOKEN_KEY)
            .and_then(|v| std::str::from_utf8(v).ok())
            .filter(|t| !t.is_empty())
    }

    pub fn trust_anchor(&self) -> Option<&[u8]> {
        self.data.get(SECRET_CA_KEY).map(Vec::as_slice)
    }

    /// Spoke namespace recorded when the token was issued
    pub fn issued_namespace(&self) -> Option<&str> {
        self.labels
            .get(LABEL_MANAGED_SERVICEACCOUNT_NAMESPACE)
            .map(String::as_str)
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("data_keys", &self.data.keys().collect::<Vec<_>>())
            .field("labels", &self.labels)
            .field("annotations", &self.annotations)
            .field("resource_version", &self.resource_version)
            .finish_non_exhaustive()
    }
}
