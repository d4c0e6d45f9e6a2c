//! Sliding-window rate limiting middleware.
//!
//! Wraps the injected [`RateLimitStore`] as a Tower layer. Two scopes exist:
//!
//! - **Global**: applied to the whole router, keyed by the derived client
//!   identity (API key if present, else IP).
//! - **Per-route**: applied via `route_layer` to routes that opt in, keyed by
//!   `route_path + client_ip` with an independently configured limit/window.
//!
//! The scopes never share counters (their store keys use distinct prefixes).
//!
//! # Response Headers
//!
//! The decision is attached to every response, admitted or not:
//! - `X-RateLimit-Limit`: configured max requests per window
//! - `X-RateLimit-Remaining`: requests left in the current window
//! - `X-RateLimit-Reset`: unix timestamp when the window resets
//!
//! On rejection the response is a terminal 429 with the structured
//! `{"error":{"code":"RATE_LIMITED",...}}` body. Rejected requests do not
//! consume a slot, and an admitted slot is never rolled back, even if the
//! request is cancelled before the response is sent.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::warn;

use crate::error::error_response;
use crate::metrics;
use crate::rate_limit::{RateLimitDecision, RateLimitStore, unix_now};

use super::identity::{client_identity, client_ip, route_identity};

/// Header carrying the configured limit.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the remaining quota.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the window reset timestamp.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Error type for rate limit layer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// Limit cannot be zero; leave the layer off instead.
    ZeroLimit,
    /// Window cannot be zero seconds.
    ZeroWindow,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroLimit => {
                write!(f, "rate limit must be greater than 0; omit the layer to disable limiting")
            }
            RateLimitError::ZeroWindow => {
                write!(f, "rate limit window must be greater than 0 seconds")
            }
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Which counter scope this layer instance enforces.
#[derive(Clone)]
enum Scope {
    /// Per-identity, router-wide.
    Global,
    /// Per-route, keyed by path + client IP.
    Route(Arc<str>),
}

impl Scope {
    fn label(&self) -> &str {
        match self {
            Scope::Global => "global",
            Scope::Route(_) => "route",
        }
    }
}

/// Rate limiting layer for the Tower middleware stack.
#[derive(Clone)]
pub struct RateLimitLayer {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window_seconds: u32,
    scope: Scope,
}

impl RateLimitLayer {
    /// Create the global per-identity layer.
    ///
    /// # Errors
    ///
    /// Returns `ZeroLimit`/`ZeroWindow` for invalid parameters; disable
    /// limiting by not applying the layer instead.
    pub fn global(
        store: Arc<dyn RateLimitStore>,
        limit: u32,
        window_seconds: u32,
    ) -> Result<Self, RateLimitError> {
        Self::new(store, limit, window_seconds, Scope::Global)
    }

    /// Create a per-route layer for `path` with its own limit and window.
    pub fn per_route(
        store: Arc<dyn RateLimitStore>,
        path: &str,
        limit: u32,
        window_seconds: u32,
    ) -> Result<Self, RateLimitError> {
        Self::new(store, limit, window_seconds, Scope::Route(Arc::from(path)))
    }

    fn new(
        store: Arc<dyn RateLimitStore>,
        limit: u32,
        window_seconds: u32,
        scope: Scope,
    ) -> Result<Self, RateLimitError> {
        if limit == 0 {
            return Err(RateLimitError::ZeroLimit);
        }
        if window_seconds == 0 {
            return Err(RateLimitError::ZeroWindow);
        }

        Ok(Self {
            store,
            limit,
            window_seconds,
            scope,
        })
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            store: self.store.clone(),
            limit: self.limit,
            window_seconds: self.window_seconds,
            scope: self.scope.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window_seconds: u32,
    scope: Scope,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let store = self.store.clone();
        let limit = self.limit;
        let window_seconds = self.window_seconds;
        let scope = self.scope.clone();
        let mut inner = self.inner.clone();

        // Clock is read once per request; no retroactive adjustment
        let now = unix_now();

        let identity = match &scope {
            Scope::Global => client_identity(&req),
            Scope::Route(path) => route_identity(path, &client_ip(&req)),
        };

        Box::pin(async move {
            let decision = store.check(&identity, limit, window_seconds, now);

            if !decision.allowed {
                let path = req.uri().path();
                warn!(
                    identity = %identity,
                    path = %path,
                    scope = scope.label(),
                    reset_at = decision.reset_at,
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited(scope.label());

                let message = match scope {
                    Scope::Global => "Too many requests",
                    Scope::Route(_) => "Rate limit exceeded for this endpoint",
                };
                let mut response =
                    error_response(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", message);
                apply_decision_headers(response.headers_mut(), &decision);
                return Ok(response);
            }

            // Admission is final once granted; the slot is not rolled back
            // even if the handler is cancelled mid-flight.
            let mut response = inner.call(req).await?;
            apply_decision_headers(response.headers_mut(), &decision);
            Ok(response)
        })
    }
}

/// Attach the three `X-RateLimit-*` headers to a response.
///
/// When layers nest (per-route inside global), the outermost layer inserts
/// last and wins, mirroring a middleware-then-dependency stack.
fn apply_decision_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let pairs = [
        (LIMIT_HEADER, decision.limit.to_string()),
        (REMAINING_HEADER, decision.remaining.to_string()),
        (RESET_HEADER, decision.reset_at.to_string()),
    ];

    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}
