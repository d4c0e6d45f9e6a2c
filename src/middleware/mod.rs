//! HTTP middleware for authentication, rate limiting, and observability.
//!
//! # Architecture
//!
//! ```text
//! Request → Rate Limiter → Auth → Request ID → Handler → Response
//!              ↓             ↓          ↓
//!          429 Too Many  401 Unauth  X-Request-Id header
//! ```
//!
//! The authenticator and rate limiter are independent per-request decisions:
//! rate limiting keys off the API key when one is present (valid or not),
//! else the client IP, so neither gate depends on the other's outcome.
//!
//! # Security Considerations
//!
//! - API key comparison is constant-time to prevent timing attacks
//! - 401 responses use one error code regardless of failure reason
//! - Identity derivation trusts forwarding headers; deploy behind a
//!   reverse proxy that overwrites them (see [`identity`])

pub mod auth;
pub mod identity;
pub mod rate_limit;
pub mod request_id;

pub use auth::{API_KEY_HEADER, AuthLayer};
pub use identity::{UNKNOWN_IP, client_identity, client_ip, route_identity};
pub use rate_limit::{
    LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER, RateLimitError, RateLimitLayer,
};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer};
