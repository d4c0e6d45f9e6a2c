//! Health, readiness, and liveness endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Basic health check, always 200 while the process runs
//! - `GET /ready` - Readiness probe; 503 if any dependency check fails
//! - `GET /live` - Minimal liveness probe
//!
//! All three bypass authentication by default so orchestrator probes and
//! load balancers work without credentials.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::instrument;

use crate::models::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "apiguard",
///   "version": "0.1.0",
///   "uptime_seconds": 3600,
///   "timestamp": "2026-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// Readiness probe for orchestrator traffic gating.
///
/// Returns 200 with per-dependency check results, or 503 when any check
/// fails. The in-memory rate-limit store has no failure mode; a distributed
/// store implementation would ping its backend here.
#[instrument]
pub async fn readiness_check() -> (StatusCode, Json<ReadinessResponse>) {
    let mut checks = BTreeMap::new();
    checks.insert("rate_limit_store".to_string(), true);

    let all_healthy = checks.values().all(|ok| *ok);

    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            checks,
        }),
    )
}

/// Liveness probe: 200 whenever the process is responding.
#[instrument(skip(state))]
pub async fn liveness_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}
