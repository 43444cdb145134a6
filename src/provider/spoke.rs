//! # Spoke Client
//!
//! ServiceAccount, TokenRequest and TokenReview access on the spoke cluster.

use super::error::{is_already_exists, is_not_found};
use super::{ClientError, Credential, Principal, SpokeIdentityApi};
use crate::constants::LABEL_IS_MANAGED_SERVICEACCOUNT;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use k8s_openapi::api::authentication::v1::{
    TokenRequest, TokenRequestSpec, TokenReview, TokenReviewSpec,
};
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Kubernetes-backed execution plane client
#[derive(Clone)]
pub struct SpokeClient {
    client: Client,
    trust_anchor: Vec<u8>,
    audiences: Vec<String>,
}

impl std::fmt::Debug for SpokeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpokeClient")
            .field("audiences", &self.audiences)
            .finish_non_exhaustive()
    }
}

impl SpokeClient {
    /// `trust_anchor` is the PEM CA bundle written next to every token.
    /// An empty `audiences` list lets the API server pick its default audience.
    pub fn new(client: Client, trust_anchor: Vec<u8>, audiences: Vec<String>) -> Self {
        Self {
            client,
            trust_anchor,
            audiences,
        }
    }
}

#[async_trait]
impl SpokeIdentityApi for SpokeClient {
    async fn get_principal(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Principal>, ClientError> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        let service_account = api.get_opt(name).await?;
        Ok(service_account.map(|sa| Principal {
            namespace: namespace.to_string(),
            name: name.to_string(),
            managed: sa
                .labels()
                .get(LABEL_IS_MANAGED_SERVICEACCOUNT)
                .is_some_and(|v| v == "true"),
        }))
    }

    async fn create_principal(
        &self,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<(), ClientError> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        let service_account = ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            ..Default::default()
        };

        match api.create(&PostParams::default(), &service_account).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                debug!("ServiceAccount {}/{} already exists", namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_principal(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn issue_token(
        &self,
        principal: &Principal,
        validity: Duration,
    ) -> Result<Credential, ClientError> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), &principal.namespace);
        let request = TokenRequest {
            spec: TokenRequestSpec {
                audiences: self.audiences.clone(),
                expiration_seconds: Some(i64::try_from(validity.as_secs()).unwrap_or(i64::MAX)),
                ..Default::default()
            },
            ..Default::default()
        };

        let response = api
            .create_token_request(&principal.name, &PostParams::default(), &request)
            .await?;
        let status = response
            .status
            .ok_or_else(|| ClientError::Remote("token request returned no status".to_string()))?;
        let expires_at = time_to_utc(&status.expiration_timestamp).ok_or_else(|| {
            ClientError::Remote("token request returned an unreadable expiration".to_string())
        })?;

        Ok(Credential {
            token: status.token,
            expires_at,
        })
    }

    async fn validate_token(&self, token: &str) -> Result<bool, ClientError> {
        let api: Api<TokenReview> = Api::all(self.client.clone());
        let review = TokenReview {
            spec: TokenReviewSpec {
                token: Some(token.to_string()),
                audiences: (!self.audiences.is_empty()).then(|| self.audiences.clone()),
                ..Default::default()
            },
            ..Default::default()
        };

        let response = api.create(&PostParams::default(), &review).await?;
        Ok(response
            .status
            .and_then(|s| s.authenticated)
            .unwrap_or(false))
    }

    fn trust_anchor(&self) -> Vec<u8> {
        self.trust_anchor.clone()
    }
}

/// Convert an API timestamp through its RFC3339 wire form
fn time_to_utc(time: &Time) -> Option<DateTime<Utc>> {
    let value = serde_json::to_value(time).ok()?;
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Encode DER certificates as a PEM bundle
pub fn pem_bundle(certificates: &[Vec<u8>]) -> Vec<u8> {
    let mut pem = String::new();
    for der in certificates {
        let encoded = base64::engine::general_purpose::STANDARD.encode(der);
        pem.push_str("-----BEGIN CERTIFICATE-----\n");
        for line in encoded.as_bytes().chunks(64) {
            pem.push_str(&String::from_utf8_lossy(line));
            pem.push('\n');
        }
        pem.push_str("-----END CERTIFICATE-----\n");
    }
    pem.into_bytes()
}
