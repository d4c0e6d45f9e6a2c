//! # apiguard
//!
//! An HTTP API gate built on Axum: sliding-window rate limiting and
//! API-key authentication in front of a minimal service surface.
//!
//! - **Authentication**: API keys validated in constant time against a
//!   configured set; bearer tokens fail closed (no trust anchor is wired up)
//! - **Rate limiting**: sliding-window counters per client identity, with
//!   optional per-route scopes, behind an injectable store interface
//! - **Observability**: request IDs, structured logging, Prometheus
//!   counters, health endpoints
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Rate Limit → Auth → Request ID → Trace/CORS)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, ready, live, whoami)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Core (Authenticator, RateLimitStore)                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apiguard::{AppState, Config, build_router};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let state = AppState::new(config);
//! let app = build_router(state)?;
//! // Serve the app...
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Configuration
//!
//! ```bash
//! API_KEYS=key-one,key-two RATE_LIMIT_REQUESTS=100 RATE_LIMIT_WINDOW_SECONDS=60 cargo run
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;

// Re-exports for convenience
pub use auth::{AuthError, Authenticator, Principal};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use rate_limit::{InMemoryStore, RateLimitDecision, RateLimitStore};
pub use routes::build_router;
pub use state::AppState;
