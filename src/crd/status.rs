//! # ManagedServiceAccount Status
//!
//! Status types for tracking the issued token and its conditions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the ManagedServiceAccount resource
///
/// Written only by the agent. Timestamps are RFC3339 strings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceAccountStatus {
    /// Conditions represent the latest available observations.
    /// Each condition type appears at most once.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Reference to the hub Secret holding the token
    #[serde(default)]
    pub token_secret_ref: Option<SecretRef>,
    /// Expiration time of the current token (RFC3339)
    #[serde(default)]
    pub expiration_timestamp: Option<String>,
}

/// Reference to the token Secret on the hub
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    /// Secret name (same as the ManagedServiceAccount)
    pub name: String,
    /// When the token in the Secret was last issued (RFC3339)
    pub last_refresh_timestamp: String,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    pub fn new(type_: &str, status: bool, reason: &str, message: impl Into<String>) -> Self {
        Self {
            r#type: type_.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: None,
            reason: Some(reason.to_string()),
            message: Some(message.into()),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

impl ManagedServiceAccountStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == type_)
    }

    /// Overwrite the condition of the same type, or append it.
    /// The transition time only moves when the status value changes.
    pub fn set_condition(&mut self, mut condition: Condition, now: DateTime<Utc>) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            Some(existing) => {
                condition.last_transition_time = if existing.status == condition.status {
                    existing.last_transition_time.take()
                } else {
                    Some(now.to_rfc3339())
                };
                *existing = condition;
            }
            None => {
                condition.last_transition_time = Some(now.to_rfc3339());
                self.conditions.push(condition);
            }
        }
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration_timestamp.as_deref().and_then(parse_timestamp)
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.token_secret_ref
            .as_ref()
            .and_then(|r| parse_timestamp(&r.last_refresh_timestamp))
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
