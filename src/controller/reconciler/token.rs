//! # Token Issuance and Validation

use crate::observability;
use crate::provider::{ClientError, Credential, Principal, SpokeIdentityApi};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to request token for service-account: {0}")]
    Request(#[source] ClientError),
}

/// Requests tokens through the spoke TokenRequest API
#[derive(Clone)]
pub struct TokenIssuer {
    spoke: Arc<dyn SpokeIdentityApi>,
}

impl TokenIssuer {
    pub fn new(spoke: Arc<dyn SpokeIdentityApi>) -> Self {
        Self { spoke }
    }

    pub async fn request(
        &self,
        principal: &Principal,
        validity: Duration,
    ) -> Result<Credential, TokenError> {
        let credential = self
            .spoke
            .issue_token(principal, validity)
            .await
            .map_err(TokenError::Request)?;

        debug!(
            "Issued token for ServiceAccount {}/{}, expires at {}",
            principal.namespace,
            principal.name,
            credential.expires_at.to_rfc3339()
        );
        observability::metrics::increment_tokens_issued();
        Ok(credential)
    }
}

/// Checks stored tokens against the spoke TokenReview API.
/// Any failure to get an answer counts as "not valid".
#[derive(Clone)]
pub struct TokenValidator {
    spoke: Arc<dyn SpokeIdentityApi>,
}

impl TokenValidator {
    pub fn new(spoke: Arc<dyn SpokeIdentityApi>) -> Self {
        Self { spoke }
    }

    pub async fn is_valid(&self, token: &str, namespace: &str) -> bool {
        match self.spoke.validate_token(token).await {
            Ok(true) => true,
            Ok(false) => {
                debug!("Stored token for namespace {} was rejected by TokenReview", namespace);
                observability::metrics::increment_token_validation_rejections();
                false
            }
            Err(e) => {
                warn!(
                    "TokenReview failed for namespace {}, treating token as invalid: {}",
                    namespace, e
                );
                observability::metrics::increment_token_validation_rejections();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockSpokeIdentityApi;
    use chrono::{TimeZone, Utc};

    fn principal() -> Principal {
        Principal {
            namespace: "spoke".to_string(),
            name: "msa1".to_string(),
            managed: true,
        }
    }

    #[tokio::test]
    async fn test_request_passes_validity_through() {
        let expires_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 8, 20).unwrap();
        let mut spoke = MockSpokeIdentityApi::new();
        spoke
            .expect_issue_token()
            .withf(|p, validity| p.name == "msa1" && *validity == Duration::from_secs(500))
            .times(1)
            .returning(move |_, _| {
                Ok(Credential {
                    token: "token1".to_string(),
                    expires_at,
                })
            });

        let issuer = TokenIssuer::new(Arc::new(spoke));
        let credential = issuer
            .request(&principal(), Duration::from_secs(500))
            .await
            .unwrap();
        assert_eq!(credential.token, "token1");
        assert_eq!(credential.expires_at, expires_at);
    }

    #[tokio::test]
    async fn test_request_error_message() {
        let mut spoke = MockSpokeIdentityApi::new();
        spoke
            .expect_issue_token()
            .returning(|_, _| Err(ClientError::Remote("failed to create token".to_string())));

        let issuer = TokenIssuer::new(Arc::new(spoke));
        let error = issuer
            .request(&principal(), Duration::from_secs(500))
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "failed to request token for service-account: failed to create token"
        );
    }

    #[tokio::test]
    async fn test_validator_accepts_authenticated_token() {
        let mut spoke = MockSpokeIdentityApi::new();
        spoke.expect_validate_token().returning(|_| Ok(true));
        assert!(TokenValidator::new(Arc::new(spoke)).is_valid("t", "spoke").await);
    }

    #[tokio::test]
    async fn test_validator_rejects_unauthenticated_token() {
        let mut spoke = MockSpokeIdentityApi::new();
        spoke.expect_validate_token().returning(|_| Ok(false));
        assert!(!TokenValidator::new(Arc::new(spoke)).is_valid("t", "spoke").await);
    }

    #[tokio::test]
    async fn test_validator_fails_closed_on_error() {
        let mut spoke = MockSpokeIdentityApi::new();
        spoke
            .expect_validate_token()
            .returning(|_| Err(ClientError::Remote("connection refused".to_string())));
        assert!(!TokenValidator::new(Arc::new(spoke)).is_valid("t", "spoke").await);
    }
}
