//! Shared application state for Axum handlers.
//!
//! The state is the composition root: it owns the configuration and the
//! rate-limit counter store, and is cloned into every handler and middleware
//! layer. The store sits behind the narrow [`RateLimitStore`] interface so a
//! distributed implementation can be injected without touching the
//! middleware.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::rate_limit::{InMemoryStore, RateLimitStore};

/// Shared application state.
///
/// Cloning is cheap; all fields are `Arc`-backed or `Copy`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared rate-limit counter store, injected into both limiter scopes
    pub limiter: Arc<dyn RateLimitStore>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create state with the default in-memory store, sized from config.
    pub fn new(config: Config) -> Self {
        let limiter = Arc::new(InMemoryStore::with_capacity(config.max_tracked_identities));
        Self::with_store(config, limiter)
    }

    /// Create state with an explicitly injected store.
    ///
    /// This is the seam for swapping in a distributed counter store for
    /// multi-instance deployments.
    pub fn with_store(config: Config, limiter: Arc<dyn RateLimitStore>) -> Self {
        Self {
            config: Arc::new(config),
            limiter,
            started_at: Instant::now(),
        }
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
