//! # Constants
//!
//! Default values and well-known keys shared across the agent.

/// Field manager used for status patches on the hub
pub const FIELD_MANAGER: &str = "managed-serviceaccount-agent";

/// Ownership marker on spoke ServiceAccounts and hub token Secrets.
/// A ServiceAccount without it was not created by the agent and is never deleted.
pub const LABEL_IS_MANAGED_SERVICEACCOUNT: &str =
    "authentication.open-cluster-management.io/is-managed-serviceaccount";

/// Name of the ManagedServiceAccount a token Secret belongs to
pub const LABEL_MANAGED_SERVICEACCOUNT_NAME: &str =
    "authentication.open-cluster-management.io/managed-serviceaccount-name";

/// Spoke namespace the token in a Secret was issued for
pub const LABEL_MANAGED_SERVICEACCOUNT_NAMESPACE: &str =
    "authentication.open-cluster-management.io/managed-serviceaccount-namespace";

/// Secret data key holding the service account token
pub const SECRET_TOKEN_KEY: &str = "token";

/// Secret data key holding the spoke API server CA bundle
pub const SECRET_CA_KEY: &str = "ca.crt";

/// Condition reported once a token has been issued or confirmed valid
pub const CONDITION_TOKEN_REPORTED: &str = "TokenReported";

/// Condition reported once the token Secret exists on the hub
pub const CONDITION_SECRET_CREATED: &str = "SecretCreated";

/// Default requested token lifetime (360 days)
pub const DEFAULT_ROTATION_VALIDITY: &str = "8640h0m0s";

/// Default spoke namespace for managed service accounts
pub const DEFAULT_SPOKE_NAMESPACE: &str = "open-cluster-management-managed-serviceaccount";

/// Rotate once this percentage of the token lifetime has elapsed
pub const DEFAULT_REFRESH_PERCENT: u8 = 80;

/// Fixed delay added to every refresh check
pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 5;

/// Error backoff bounds (seconds)
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// HTTP server port for metrics and probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Server startup timeout (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Server readiness poll interval (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Condition reasons
pub const REASON_TOKEN_REPORTED: &str = "TokenReported";
pub const REASON_TOKEN_REPORT_FAILED: &str = "TokenReportFailed";
pub const REASON_INVALID_ROTATION_VALIDITY: &str = "InvalidRotationValidity";
pub const REASON_SERVICE_ACCOUNT_NOT_READY: &str = "ServiceAccountNotReady";
pub const REASON_SECRET_CREATED: &str = "SecretCreated";
pub const REASON_SECRET_CREATE_FAILED: &str = "SecretCreateFailed";
