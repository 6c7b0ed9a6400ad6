use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::limiter::{Admission, AdmissionError, RateLimitPolicy};
use super::DEFAULT_MAX_TRACKED;

/// Counter state for one identifier within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub expires_at: DateTime<Utc>,
}

impl RateLimitRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Backend holding per-identifier counters.
///
/// `admit` must apply the read-check-increment sequence atomically for the
/// identifier it is given.
pub trait RateLimitStore: Send + Sync {
    fn admit(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<Admission, AdmissionError>;
}

/// Applies one request to `record` under fixed-window rules.
///
/// A missing or expired record is replaced by a fresh window. A record at its
/// limit is left untouched and the request is rejected.
pub fn admit_fixed_window(
    record: &mut Option<RateLimitRecord>,
    now: DateTime<Utc>,
    policy: &RateLimitPolicy,
) -> Admission {
    if let Some(current) = record.as_mut().filter(|current| !current.is_expired(now)) {
        if current.count >= policy.limit {
            return Admission {
                success: false,
                limit: policy.limit,
                remaining: 0,
                reset: current.expires_at,
            };
        }

        current.count += 1;
        return Admission {
            success: true,
            limit: policy.limit,
            remaining: policy.limit - current.count,
            reset: current.expires_at,
        };
    }

    let fresh = RateLimitRecord {
        count: 1,
        expires_at: now + policy.window,
    };
    *record = Some(fresh);
    Admission {
        success: true,
        limit: policy.limit,
        remaining: policy.limit - 1,
        reset: fresh.expires_at,
    }
}

/// Process-local store guarded by a single mutex.
///
/// Once more than `max_tracked` identifiers are held the whole map is dropped
/// before the next request is counted.
pub struct MemoryRateLimitStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
    max_tracked: usize,
}

impl MemoryRateLimitStore {
    pub fn new(max_tracked: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            max_tracked,
        }
    }

    pub fn tracked(&self) -> usize {
        self.records.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl Default for MemoryRateLimitStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRACKED)
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn admit(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<Admission, AdmissionError> {
        policy.validate()?;
        let mut guard = self
            .records
            .lock()
            .map_err(|_| AdmissionError::StoreUnavailable("rate limit mutex poisoned".into()))?;

        if guard.len() > self.max_tracked {
            warn!(
                tracked = guard.len(),
                ceiling = self.max_tracked,
                "rate limit store over capacity; clearing all windows"
            );
            guard.clear();
        }

        let mut record = guard.get(identifier).copied();
        let admission = admit_fixed_window(&mut record, now, policy);
        if let Some(record) = record {
            guard.insert(identifier.to_string(), record);
        }
        Ok(admission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn policy(limit: u32) -> RateLimitPolicy {
        RateLimitPolicy::new(limit, 60_000).expect("valid policy")
    }

    #[test]
    fn missing_record_opens_a_window() {
        let mut record = None;
        let admission = admit_fixed_window(&mut record, now(), &policy(10));
        assert!(admission.success);
        assert_eq!(admission.remaining, 9);
        assert_eq!(
            record,
            Some(RateLimitRecord {
                count: 1,
                expires_at: now() + Duration::minutes(1),
            })
        );
    }

    #[test]
    fn rejection_leaves_record_unchanged() {
        let expires_at = now() + Duration::seconds(30);
        let mut record = Some(RateLimitRecord {
            count: 2,
            expires_at,
        });
        let admission = admit_fixed_window(&mut record, now(), &policy(2));
        assert!(!admission.success);
        assert_eq!(admission.reset, expires_at);
        assert_eq!(record.map(|r| r.count), Some(2));
    }

    #[test]
    fn expired_record_is_replaced() {
        let mut record = Some(RateLimitRecord {
            count: 7,
            expires_at: now() - Duration::seconds(1),
        });
        let admission = admit_fixed_window(&mut record, now(), &policy(7));
        assert!(admission.success);
        assert_eq!(admission.remaining, 6);
        assert_eq!(record.map(|r| r.count), Some(1));
    }

    #[test]
    fn store_clears_everything_once_over_capacity() {
        let store = MemoryRateLimitStore::new(3);
        for id in ["a", "b", "c", "d"] {
            store.admit(id, now(), &policy(5)).expect("store available");
        }
        assert_eq!(store.tracked(), 4);

        // "a" had used one request; after the wipe it starts over
        let admission = store.admit("a", now(), &policy(5)).expect("store available");
        assert_eq!(admission.remaining, 4);
        assert_eq!(store.tracked(), 1);
    }

    #[test]
    fn store_refuses_windows_longer_than_a_day() {
        let store = MemoryRateLimitStore::default();
        let yearly = RateLimitPolicy {
            limit: 3,
            window: Duration::days(365),
        };
        assert!(matches!(
            store.admit("ip", now(), &yearly),
            Err(AdmissionError::InvalidPolicy(_))
        ));
        assert_eq!(store.tracked(), 0);
    }

    #[test]
    fn store_counts_within_window() {
        let store = MemoryRateLimitStore::default();
        let first = store.admit("ip", now(), &policy(3)).expect("store available");
        let second = store
            .admit("ip", now() + Duration::seconds(10), &policy(3))
            .expect("store available");
        assert_eq!(first.remaining, 2);
        assert_eq!(second.remaining, 1);
        assert_eq!(first.reset, second.reset);
    }
}
