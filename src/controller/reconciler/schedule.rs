//! # Refresh Scheduling
//!
//! Decides when a token is due for rotation and when to look at it again.
//!
//! A token issued at `last_refresh` and expiring at `expiration` is rotated once
//! `refresh_percent` of its lifetime has elapsed. Every requeue interval carries
//! a small fixed buffer so the next pass lands just after the threshold.

use crate::constants::{DEFAULT_REFRESH_BUFFER_SECS, DEFAULT_REFRESH_PERCENT};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Outcome of a refresh evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCheck {
    /// The rotation threshold has been reached
    pub due: bool,
    /// Time until the next check, buffer included
    pub requeue_after: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshScheduler {
    refresh_percent: u8,
    buffer: Duration,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self {
            refresh_percent: DEFAULT_REFRESH_PERCENT,
            buffer: Duration::from_secs(DEFAULT_REFRESH_BUFFER_SECS),
        }
    }
}

impl RefreshScheduler {
    /// `refresh_percent` is clamped to 1..=100
    pub fn new(refresh_percent: u8, buffer: Duration) -> Self {
        Self {
            refresh_percent: refresh_percent.clamp(1, 100),
            buffer,
        }
    }

    pub fn refresh_percent(&self) -> u8 {
        self.refresh_percent
    }

    pub fn buffer(&self) -> Duration {
        self.buffer
    }

    /// Instant at which rotation becomes due
    pub fn refresh_threshold(
        &self,
        expiration: DateTime<Utc>,
        last_refresh: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let validity_ms = (expiration - last_refresh).num_milliseconds();
        let offset_ms = validity_ms.saturating_mul(i64::from(self.refresh_percent)) / 100;
        last_refresh
            .checked_add_signed(TimeDelta::milliseconds(offset_ms))
            .unwrap_or(expiration)
    }

    pub fn evaluate(
        &self,
        now: DateTime<Utc>,
        expiration: DateTime<Utc>,
        last_refresh: DateTime<Utc>,
    ) -> RefreshCheck {
        let remaining = self.refresh_threshold(expiration, last_refresh) - now;
        // Negative deltas fail to convert and clamp to zero
        let remaining = remaining.to_std().unwrap_or(Duration::ZERO);
        RefreshCheck {
            due: remaining.is_zero(),
            requeue_after: remaining + self.buffer,
        }
    }

    /// Requeue interval for a token with the given timing
    pub fn next_check(
        &self,
        now: DateTime<Utc>,
        expiration: DateTime<Utc>,
        last_refresh: DateTime<Utc>,
    ) -> Duration {
        self.evaluate(now, expiration, last_refresh).requeue_after
    }
}
