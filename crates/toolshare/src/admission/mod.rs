//! Admission control for request handlers.
//!
//! A [`RateLimiter`] applies a fixed-window quota per caller identifier. The
//! counters live behind the [`RateLimitStore`] trait so the in-memory map used
//! by a single instance can be replaced by a shared backend without touching
//! the handlers that call [`RateLimiter::check`].

mod clock;
mod limiter;
pub mod middleware;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{Admission, AdmissionError, RateLimitPolicy, RateLimiter};
pub use store::{admit_fixed_window, MemoryRateLimitStore, RateLimitRecord, RateLimitStore};

/// Identifiers tracked by the in-memory store before it is cleared wholesale.
pub const DEFAULT_MAX_TRACKED: usize = 10_000;
