//! Authentication middleware.
//!
//! Applies the [`Authenticator`] to every request: the API key from
//! `X-API-Key` is checked first, then the bearer token from
//! `Authorization: Bearer <token>` (which always fails closed — see
//! [`crate::auth`]). The first hard rejection wins; there is no fallback
//! past an invalid key.
//!
//! On success the resulting [`crate::auth::Principal`] is inserted into the request
//! extensions for handlers to read. On failure the middleware answers with
//! a terminal 401 carrying `WWW-Authenticate: Bearer` and the structured
//! `UNAUTHORIZED` error body.
//!
//! # Bypassed Endpoints
//!
//! Configured bypass paths (health probes by default) are matched exactly
//! and case-sensitively against the request path, so `/health` passes but
//! `/health/` or `/HEALTH` do not. This strictness prevents accidental
//! bypasses via path manipulation.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::auth::{AuthError, Authenticator};
use crate::error::error_response;
use crate::metrics;

/// Header name for API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication layer for the Tower middleware stack.
#[derive(Clone)]
pub struct AuthLayer {
    authenticator: Arc<Authenticator>,
    bypass_paths: Arc<Vec<String>>,
}

impl AuthLayer {
    /// Create an authentication layer.
    ///
    /// # Arguments
    ///
    /// * `authenticator` - Credential validator built from the configured key set
    /// * `bypass_paths` - Paths that skip authentication (health endpoints)
    pub fn new(authenticator: Authenticator, bypass_paths: Vec<String>) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            bypass_paths: Arc::new(bypass_paths),
        }
    }

    /// Whether authentication is enabled (any keys configured).
    pub fn is_enabled(&self) -> bool {
        self.authenticator.is_enabled()
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            authenticator: self.authenticator.clone(),
            bypass_paths: self.bypass_paths.clone(),
        }
    }
}

/// Authentication service wrapper.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    authenticator: Arc<Authenticator>,
    bypass_paths: Arc<Vec<String>>,
}

impl<S> Service<Request<Body>> for AuthService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let authenticator = self.authenticator.clone();
        let bypass_paths = self.bypass_paths.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path();
            if bypass_paths.iter().any(|p| p == path) {
                debug!(path, "Bypassing auth for health endpoint");
                return inner.call(req).await;
            }

            let api_key = extract_api_key(&req);
            let bearer = extract_bearer_token(&req);

            // API key is checked before bearer; the first rejection is final
            let outcome = authenticator
                .verify_api_key(api_key.as_deref())
                .and_then(|key| {
                    let claims = authenticator.verify_bearer(bearer.as_deref())?;
                    authenticator.authenticate(key, claims)
                });

            match outcome {
                Ok(principal) => {
                    debug!(path = %req.uri().path(), "Authentication successful");
                    req.extensions_mut().insert(principal);
                    inner.call(req).await
                }
                Err(error) => {
                    warn!(
                        path = %req.uri().path(),
                        error = %error,
                        "Authentication failed"
                    );
                    metrics::record_auth_failure(failure_label(error));
                    Ok(unauthorized_response(error))
                }
            }
        })
    }
}

/// Extract the API key from the `X-API-Key` header, if present.
fn extract_api_key<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Extract a bearer token from the `Authorization` header, if present.
///
/// Non-Bearer authorization schemes are treated as absent credentials, not
/// as malformed ones.
fn extract_bearer_token<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build the 401 response for an authentication failure.
///
/// Every failure uses the same `UNAUTHORIZED` code so responses do not leak
/// whether a key was unrecognized vs. missing; only the message differs.
fn unauthorized_response(error: AuthError) -> Response<Body> {
    let mut response =
        error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", error.to_string());
    response.headers_mut().insert(
        axum::http::header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer"),
    );
    response
}

fn failure_label(error: AuthError) -> &'static str {
    match error {
        AuthError::InvalidApiKey => "invalid_api_key",
        AuthError::BearerNotConfigured => "bearer_not_configured",
        AuthError::AuthenticationRequired => "missing_credentials",
    }
}
