use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::clock::{Clock, SystemClock};
use super::store::RateLimitStore;

/// Quota applied to each identifier: `limit` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const DEFAULT_WINDOW_MS: i64 = 60_000;
    /// Longest accepted window: one day.
    pub const MAX_WINDOW_MS: i64 = 86_400_000;

    pub fn new(limit: u32, window_ms: i64) -> Result<Self, AdmissionError> {
        if window_ms > Self::MAX_WINDOW_MS {
            return Err(AdmissionError::InvalidPolicy(format!(
                "window must not exceed {} ms",
                Self::MAX_WINDOW_MS
            )));
        }
        let policy = Self {
            limit,
            window: Duration::milliseconds(window_ms),
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), AdmissionError> {
        if self.limit == 0 {
            return Err(AdmissionError::InvalidPolicy(
                "limit must be at least 1".to_string(),
            ));
        }
        if self.window <= Duration::zero() {
            return Err(AdmissionError::InvalidPolicy(
                "window must be positive".to_string(),
            ));
        }
        if self.window > Duration::milliseconds(Self::MAX_WINDOW_MS) {
            return Err(AdmissionError::InvalidPolicy(format!(
                "window must not exceed {} ms",
                Self::MAX_WINDOW_MS
            )));
        }
        Ok(())
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            window: Duration::milliseconds(Self::DEFAULT_WINDOW_MS),
        }
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Admission {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    /// End of the current window.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub reset: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("invalid rate limit policy: {0}")]
    InvalidPolicy(String),
    #[error("rate limit store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Fixed-window rate limiter over an injected counter store.
pub struct RateLimiter<S, C = SystemClock> {
    store: Arc<S>,
    clock: C,
    policy: RateLimitPolicy,
}

impl<S> RateLimiter<S, SystemClock>
where
    S: RateLimitStore,
{
    pub fn new(store: Arc<S>, policy: RateLimitPolicy) -> Self {
        Self::with_clock(store, SystemClock, policy)
    }
}

impl<S, C> RateLimiter<S, C>
where
    S: RateLimitStore,
    C: Clock,
{
    pub fn with_clock(store: Arc<S>, clock: C, policy: RateLimitPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Counts one request for `identifier` against the configured policy.
    pub fn check(&self, identifier: &str) -> Result<Admission, AdmissionError> {
        self.check_with(identifier, &self.policy)
    }

    /// Counts one request for `identifier` against an explicit policy.
    pub fn check_with(
        &self,
        identifier: &str,
        policy: &RateLimitPolicy,
    ) -> Result<Admission, AdmissionError> {
        policy.validate()?;
        self.store.admit(identifier, self.clock.now(), policy)
    }
}
