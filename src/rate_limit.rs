//! Sliding-window rate limiting core.
//!
//! # Algorithm
//!
//! For each client identity the store keeps an ordered log of request
//! timestamps (seconds). On every check the log is pruned to entries newer
//! than `now - window_seconds`; the remaining count decides admission:
//!
//! - `count >= limit` rejects, and the log is NOT appended to — a rejected
//!   request never consumes a slot.
//! - Otherwise the current timestamp is appended and the request is admitted.
//!
//! Pruning is lazy, on the hot path. There is no background sweeper.
//!
//! # Concurrency
//!
//! The prune-count-append sequence runs under a single lock, so concurrent
//! checks for the same identity are linearizable: with N simultaneous checks
//! and limit L, exactly L are admitted.
//!
//! # Clock
//!
//! Callers read the wall clock once per request ([`unix_now`]) and pass it
//! in. A backwards clock jump can temporarily admit more than `limit`
//! requests; strict monotonicity is a documented non-goal.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default cap on the number of tracked identities.
///
/// Without a cap, every distinct identity creates a permanent map entry.
/// When the cap is hit, identities whose entire log has aged out of the
/// current window are dropped inline (a long-idle identity's history
/// resets).
pub const DEFAULT_MAX_TRACKED_IDENTITIES: usize = 10_000;

/// Outcome of a rate-limit check.
///
/// Computed fresh per request; never persisted beyond the response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitDecision {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// The configured limit, echoed for the `X-RateLimit-Limit` header.
    pub limit: u32,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Unix timestamp (seconds) when the window resets.
    pub reset_at: i64,
}

/// Narrow interface over the shared counter store.
///
/// The store is owned by the composition root ([`crate::state::AppState`])
/// and injected into the middleware — never a hidden global. Swapping in a
/// distributed implementation (e.g. an atomic increment-and-expire primitive
/// in Redis) only has to honor the same per-identity atomicity contract.
pub trait RateLimitStore: Send + Sync {
    /// Check and record a request for `identity`.
    ///
    /// Preconditions: `limit > 0`, `window_seconds > 0` (validated at
    /// configuration time). Always returns a decision; exhaustion is a
    /// normal outcome, not an error.
    fn check(&self, identity: &str, limit: u32, window_seconds: u32, now: f64)
    -> RateLimitDecision;
}

/// Read the wall clock once, as fractional seconds since the Unix epoch.
///
/// Returns 0.0 if the system clock is before the epoch.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// In-memory sliding-window store for single-instance deployments.
///
/// A single mutex guards the whole identity map. Window sizes are small in
/// practice, so the O(count-in-window) prune per check is acceptable.
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Vec<f64>>>,
    max_identities: usize,
}

impl InMemoryStore {
    /// Create a store with the default identity cap.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_TRACKED_IDENTITIES)
    }

    /// Create a store capped at `max_identities` tracked identities.
    pub fn with_capacity(max_identities: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_identities: max_identities.max(1),
        }
    }

    /// Number of identities currently tracked.
    pub fn tracked_identities(&self) -> usize {
        self.lock_entries().len()
    }

    /// Current log length for an identity (after any prior pruning).
    #[cfg(test)]
    fn log_len(&self, identity: &str) -> usize {
        self.lock_entries().get(identity).map_or(0, Vec::len)
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<f64>>> {
        // A poisoned lock only means another thread panicked mid-check;
        // the map itself is still structurally valid.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitStore for InMemoryStore {
    fn check(
        &self,
        identity: &str,
        limit: u32,
        window_seconds: u32,
        now: f64,
    ) -> RateLimitDecision {
        let window_start = now - f64::from(window_seconds);
        let reset_at = window_start.floor() as i64 + i64::from(window_seconds);

        let mut entries = self.lock_entries();

        // Bounded key-space: before inserting a never-seen identity over the
        // cap, drop identities whose newest entry has aged out of the window.
        if entries.len() >= self.max_identities && !entries.contains_key(identity) {
            entries.retain(|_, log| log.last().is_some_and(|t| *t > window_start));
        }

        let log = entries.entry(identity.to_string()).or_default();
        log.retain(|t| *t > window_start);

        let count = u32::try_from(log.len()).unwrap_or(u32::MAX);
        let remaining = limit.saturating_sub(count.saturating_add(1));

        if count >= limit {
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_at,
            };
        }

        log.push(now);
        RateLimitDecision {
            allowed: true,
            limit,
            remaining,
            reset_at,
        }
    }
}
