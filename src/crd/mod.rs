//! # Custom Resource Definitions
//!
//! CRD types for the managed service account agent.
//!
//! The agent reads `ManagedServiceAccount` resources from the hub cluster namespace
//! and reports token state back through their status.

mod status;

pub use status::{Condition, ManagedServiceAccountStatus, SecretRef};

use crate::constants::DEFAULT_ROTATION_VALIDITY;
use serde::{Deserialize, Serialize};

/// ManagedServiceAccount Custom Resource Definition
///
/// Declares that a token for a service account of the same name should be
/// issued on the spoke cluster and projected into a hub Secret.
///
/// # Example
///
/// ```yaml
/// apiVersion: authentication.open-cluster-management.io/v1beta1
/// kind: ManagedServiceAccount
/// metadata:
///   name: observability-reader
///   namespace: cluster1
/// spec:
///   rotation:
///     validity: 720h0m0s
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ManagedServiceAccount",
    group = "authentication.open-cluster-management.io",
    version = "v1beta1",
    namespaced,
    status = "ManagedServiceAccountStatus",
    shortname = "msa",
    printcolumn = r#"{"name":"TokenReported", "type":"string", "jsonPath":".status.conditions[?(@.type==\"TokenReported\")].status"}, {"name":"Expiration", "type":"string", "jsonPath":".status.expirationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceAccountSpec {
    /// Token rotation settings
    #[serde(default)]
    pub rotation: Rotation,
}

/// Token rotation settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    /// Requested lifetime of each issued token
    /// Format: Go duration string (e.g., "500s", "1h30m", "8640h0m0s")
    /// Default: "8640h0m0s" (360 days)
    #[serde(default = "default_rotation_validity")]
    pub validity: String,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            validity: default_rotation_validity(),
        }
    }
}

fn default_rotation_validity() -> String {
    DEFAULT_ROTATION_VALIDITY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_spec_defaults_when_rotation_missing() {
        let spec: ManagedServiceAccountSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.rotation.validity, "8640h0m0s");
    }

    #[test]
    fn test_spec_reads_camel_case_validity() {
        let spec: ManagedServiceAccountSpec =
            serde_json::from_value(serde_json::json!({"rotation": {"validity": "500s"}})).unwrap();
        assert_eq!(spec.rotation.validity, "500s");
    }

    #[test]
    fn test_crd_identity() {
        let crd = ManagedServiceAccount::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("managedserviceaccounts.authentication.open-cluster-management.io")
        );
        assert_eq!(crd.spec.names.kind, "ManagedServiceAccount");
        assert_eq!(crd.spec.versions[0].name, "v1beta1");
    }
}
