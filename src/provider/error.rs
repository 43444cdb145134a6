//! # Client Errors
//!
//! Errors returned by hub and spoke clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Kubernetes API or transport failure
    #[error(transparent)]
    Kube(kube::Error),
    /// Optimistic write lost against a concurrent writer (HTTP 409)
    #[error("conflict: {0}")]
    Conflict(String),
    /// Any other remote failure
    #[error("{0}")]
    Remote(String),
}

impl From<kube::Error> for ClientError {
    fn from(error: kube::Error) -> Self {
        match &error {
            kube::Error::Api(response) if response.code == 409 => {
                Self::Conflict(response.message.clone())
            }
            _ => Self::Kube(error),
        }
    }
}

impl ClientError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// True for HTTP 404 responses
pub(crate) fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

/// True for create calls that lost against an existing object
pub(crate) fn is_already_exists(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 409 && response.reason == "AlreadyExists")
}
