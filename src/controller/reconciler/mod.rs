//! # Reconciler
//!
//! Keeps a spoke ServiceAccount token projected into a hub Secret for every
//! ManagedServiceAccount in the cluster namespace.
//!
//! ## Components
//!
//! - `principal` - spoke ServiceAccount ensure/cleanup
//! - `token` - TokenRequest issuance and TokenReview validation
//! - `secret` - hub Secret writes
//! - `schedule` - rotation threshold and requeue timing
//! - `status` - conditions and status writes
//! - `reconcile` - the pass that ties them together

pub mod principal;
pub mod reconcile;
pub mod schedule;
pub mod secret;
pub mod status;
pub mod token;
pub mod types;
pub mod validation;

pub use principal::{CleanupOutcome, PrincipalError, PrincipalManager};
pub use reconcile::{reconcile, TokenReconciler};
pub use schedule::{RefreshCheck, RefreshScheduler};
pub use secret::CredentialStore;
pub use status::StatusReporter;
pub use token::{TokenError, TokenIssuer, TokenValidator};
pub use types::{BackoffState, Reconciler, ReconcilerError};
pub use validation::{parse_go_duration, DurationError};
