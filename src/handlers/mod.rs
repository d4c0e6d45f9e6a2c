//! HTTP request handlers.

pub mod health;
pub mod principal;

pub use health::{health_check, liveness_check, readiness_check};
pub use principal::whoami;
