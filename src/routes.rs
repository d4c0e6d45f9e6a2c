//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← 429 if exceeded (global, per-identity)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Authentication  │ ← 401 if invalid (bypassed for /health, /ready, /live)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Adds X-Request-Id header
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Trace / CORS     │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Per-route limit  │ ← only on routes with a ROUTE_RATE_LIMITS entry
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! The global limiter admits (and consumes a slot) before the per-route
//! limiter runs; a per-route 429 therefore still counts against the global
//! window, matching a middleware-plus-route-dependency stack.

use axum::Router;
use axum::routing::{MethodRouter, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::Authenticator;
use crate::handlers;
use crate::middleware::{AuthLayer, RateLimitError, RateLimitLayer, RequestIdLayer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// # Middleware Configuration
///
/// - **Rate Limiting**: enabled if `rate_limit_requests > 0`; per-route
///   scopes come from `route_limits`
/// - **Authentication**: enabled if any API key is configured
/// - **CORS**: configured from `cors_allowed_origins`
///
/// # Errors
///
/// Returns `RateLimitError` if a limiter is configured with a zero limit
/// or window (config validation normally rejects this earlier).
pub fn build_router(state: AppState) -> Result<Router, RateLimitError> {
    let config = state.config.clone();

    let cors = build_cors_layer(&config.cors_allowed_origins);

    let mut router: Router<AppState> = Router::new()
        // Health endpoints (bypass authentication by default)
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        // Protected endpoints
        .merge(guarded_route("/whoami", get(handlers::whoami), &state)?);

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. CORS
    router = router.layer(cors);

    // 2. Tracing
    router = router.layer(TraceLayer::new_for_http());

    // 3. Request ID
    router = router.layer(RequestIdLayer::new());

    // 4. Authentication (if enabled)
    let auth_layer = AuthLayer::new(
        Authenticator::new(config.api_keys.clone()),
        config.auth_bypass_paths.clone(),
    );
    if auth_layer.is_enabled() {
        info!(
            bypass_paths = config.auth_bypass_paths.len(),
            "API key authentication enabled"
        );
        router = router.layer(auth_layer);
    } else {
        info!("API key authentication disabled (no API_KEYS set)");
    }

    // 5. Global rate limiting (if enabled) - applied last, runs first
    if config.rate_limiting_enabled() {
        info!(
            requests = config.rate_limit_requests,
            window_seconds = config.rate_limit_window_seconds,
            "Global rate limiting enabled"
        );
        router = router.layer(RateLimitLayer::global(
            state.limiter.clone(),
            config.rate_limit_requests,
            config.rate_limit_window_seconds,
        )?);
    } else {
        info!("Rate limiting disabled (RATE_LIMIT_REQUESTS=0)");
    }

    Ok(router.with_state(state))
}

/// Register a route, attaching a per-route rate limiter when the config
/// carries an override for its path.
fn guarded_route(
    path: &str,
    method_router: MethodRouter<AppState>,
    state: &AppState,
) -> Result<Router<AppState>, RateLimitError> {
    let mut router = Router::new().route(path, method_router);

    if let Some(route_limit) = state.config.route_limit(path) {
        info!(
            path,
            requests = route_limit.requests,
            window_seconds = route_limit.window_seconds,
            "Per-route rate limit enabled"
        );
        router = router.route_layer(RateLimitLayer::per_route(
            state.limiter.clone(),
            path,
            route_limit.requests,
            route_limit.window_seconds,
        )?);
    }

    Ok(router)
}

/// Build CORS layer from configuration.
///
/// Using `*` (any origin) is convenient for development but should be
/// avoided in production.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
