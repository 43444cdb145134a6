//! # Controller Metrics
//!
//! Metrics for reconciliations, token handling and ServiceAccount lifecycle.

use crate::observability::metrics::registry::REGISTRY;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

// Reconciliation metrics
static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "managed_serviceaccount_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "managed_serviceaccount_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "managed_serviceaccount_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

// Token metrics
static TOKENS_ISSUED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "managed_serviceaccount_tokens_issued_total",
        "Total number of tokens issued through TokenRequest",
    )
    .expect("Failed to create TOKENS_ISSUED_TOTAL metric - this should never happen")
});

static TOKEN_VALIDATION_REJECTIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "managed_serviceaccount_token_validation_rejections_total",
        "Total number of stored tokens rejected or unverifiable by TokenReview",
    )
    .expect("Failed to create TOKEN_VALIDATION_REJECTIONS_TOTAL metric - this should never happen")
});

// ServiceAccount metrics
static SERVICE_ACCOUNTS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "managed_serviceaccount_service_accounts_created_total",
        "Total number of spoke ServiceAccounts created",
    )
    .expect("Failed to create SERVICE_ACCOUNTS_CREATED_TOTAL metric - this should never happen")
});

static SERVICE_ACCOUNTS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "managed_serviceaccount_service_accounts_deleted_total",
        "Total number of spoke ServiceAccounts deleted",
    )
    .expect("Failed to create SERVICE_ACCOUNTS_DELETED_TOTAL metric - this should never happen")
});

// Requeue metrics
static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "managed_serviceaccount_requeues_total",
            "Total number of reconciliation requeues",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register controller metrics with the registry
pub(crate) fn register_controller_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(TOKENS_ISSUED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TOKEN_VALIDATION_REJECTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SERVICE_ACCOUNTS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SERVICE_ACCOUNTS_DELETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

// Public functions for controller metrics

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_tokens_issued() {
    TOKENS_ISSUED_TOTAL.inc();
}

pub fn increment_token_validation_rejections() {
    TOKEN_VALIDATION_REJECTIONS_TOTAL.inc();
}

pub fn increment_service_accounts_created() {
    SERVICE_ACCOUNTS_CREATED_TOTAL.inc();
}

pub fn increment_service_accounts_deleted() {
    SERVICE_ACCOUNTS_DELETED_TOTAL.inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
