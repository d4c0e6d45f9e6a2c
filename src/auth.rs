//! API-key and bearer-token authentication core.
//!
//! # Credential flow
//!
//! 1. The API key (from `X-API-Key`) is verified against the configured key
//!    set. An invalid key fails immediately — there is no fallback to the
//!    bearer path past a hard rejection.
//! 2. A bearer token (from `Authorization: Bearer ...`) always fails closed:
//!    no verification backend (JWT secret, OAuth issuer) is wired up, and
//!    guessing one is worse than rejecting. This is intentional, not a bug.
//! 3. [`Authenticator::authenticate`] combines the two results into a
//!    [`Principal`], or `AuthenticationRequired` when neither credential was
//!    supplied.
//!
//! # Security
//!
//! - Key comparison is constant-time (via `subtle`) across the whole key
//!   set, so response timing does not reveal how close a guess was.
//! - All failures surface as HTTP 401 with the same `UNAUTHORIZED` code;
//!   only the message differs. Clients cannot distinguish "key unknown"
//!   from "key missing" by code, which blunts brute-force probing.

use serde::Serialize;
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;

/// Number of key characters echoed back in a principal's `key_prefix`.
pub const KEY_PREFIX_LEN: usize = 8;

/// Authentication failures. Every variant maps 1:1 to HTTP 401.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Bearer token authentication not configured")]
    BearerNotConfigured,

    #[error("Authentication required")]
    AuthenticationRequired,
}

/// Decoded bearer-token payload.
///
/// Kept schemaless: the bearer path is a fail-closed stub, so no claims are
/// ever produced in practice.
pub type Claims = serde_json::Value;

/// The authenticated-caller descriptor produced after credential validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Principal {
    /// Authenticated via API key. Only a truncated prefix is retained so the
    /// full key never lands in logs or response bodies.
    #[serde(rename = "api_key")]
    ApiKey { key_prefix: String },

    /// Authenticated via bearer token.
    #[serde(rename = "token")]
    Token { claims: Claims },
}

/// Validates request credentials against the configured key set.
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    valid_keys: Vec<String>,
}

impl Authenticator {
    /// Create an authenticator over the configured valid-key set.
    pub fn new(valid_keys: Vec<String>) -> Self {
        Self { valid_keys }
    }

    /// Whether any API keys are configured.
    pub fn is_enabled(&self) -> bool {
        !self.valid_keys.is_empty()
    }

    /// Verify an API key, if one was supplied.
    ///
    /// Absent input is not a failure — the caller may still authenticate via
    /// another credential, or fail later with `AuthenticationRequired`.
    pub fn verify_api_key(&self, api_key: Option<&str>) -> Result<Option<String>, AuthError> {
        let Some(key) = api_key else {
            return Ok(None);
        };

        // Fold over the whole set without early exit so timing reveals
        // neither a match position nor a near-miss.
        let mut matched = Choice::from(0u8);
        for valid in &self.valid_keys {
            matched |= valid.as_bytes().ct_eq(key.as_bytes());
        }

        if bool::from(matched) {
            Ok(Some(key.to_string()))
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }

    /// Verify a bearer token, if one was supplied.
    ///
    /// Any present token fails closed with `BearerNotConfigured`: there is
    /// no trust anchor to verify against.
    pub fn verify_bearer(&self, token: Option<&str>) -> Result<Option<Claims>, AuthError> {
        match token {
            None => Ok(None),
            Some(_) => Err(AuthError::BearerNotConfigured),
        }
    }

    /// Combine verified credentials into a principal.
    ///
    /// API key wins over bearer when both verified; no credential at all is
    /// `AuthenticationRequired`.
    pub fn authenticate(
        &self,
        api_key: Option<String>,
        claims: Option<Claims>,
    ) -> Result<Principal, AuthError> {
        if let Some(key) = api_key {
            return Ok(Principal::ApiKey {
                key_prefix: key_prefix(&key),
            });
        }

        if let Some(claims) = claims {
            return Ok(Principal::Token { claims });
        }

        Err(AuthError::AuthenticationRequired)
    }
}

/// Truncate a key to its first [`KEY_PREFIX_LEN`] characters plus `"..."`.
fn key_prefix(key: &str) -> String {
    let mut prefix: String = key.chars().take(KEY_PREFIX_LEN).collect();
    prefix.push_str("...");
    prefix
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(vec!["good".to_string(), "good_1234567890".to_string()])
    }

    #[test]
    fn test_verify_api_key_absent_is_ok() {
        assert_eq!(authenticator().verify_api_key(None), Ok(None));
    }

    #[test]
    fn test_verify_api_key_invalid() {
        assert_eq!(
            authenticator().verify_api_key(Some("bad")),
            Err(AuthError::InvalidApiKey)
        );
    }

    #[test]
    fn test_verify_api_key_valid_echoes_key() {
        assert_eq!(
            authenticator().verify_api_key(Some("good")),
            Ok(Some("good".to_string()))
        );
    }

    #[test]
    fn test_verify_api_key_empty_key_set_rejects_everything() {
        let auth = Authenticator::new(vec![]);
        assert!(!auth.is_enabled());
        assert_eq!(
            auth.verify_api_key(Some("anything")),
            Err(AuthError::InvalidApiKey)
        );
    }

    #[test]
    fn test_verify_bearer_absent_is_ok() {
        assert_eq!(authenticator().verify_bearer(None), Ok(None));
    }

    #[test]
    fn test_verify_bearer_always_fails_closed() {
        assert_eq!(
            authenticator().verify_bearer(Some("eyJhbGciOiJIUzI1NiJ9.e30.x")),
            Err(AuthError::BearerNotConfigured)
        );
    }

    #[test]
    fn test_authenticate_api_key_wins() {
        let principal = authenticator()
            .authenticate(
                Some("good_1234567890".to_string()),
                Some(serde_json::json!({"sub": "u1"})),
            )
            .unwrap();

        assert_eq!(
            principal,
            Principal::ApiKey {
                key_prefix: "good_123...".to_string()
            }
        );
    }

    #[test]
    fn test_authenticate_token_when_no_key() {
        let claims = serde_json::json!({"sub": "u1"});
        let principal = authenticator()
            .authenticate(None, Some(claims.clone()))
            .unwrap();

        assert_eq!(principal, Principal::Token { claims });
    }

    #[test]
    fn test_authenticate_nothing_supplied() {
        assert_eq!(
            authenticator().authenticate(None, None),
            Err(AuthError::AuthenticationRequired)
        );
    }

    #[test]
    fn test_key_prefix_truncates_long_keys() {
        assert_eq!(key_prefix("good_1234567890"), "good_123...");
    }

    #[test]
    fn test_key_prefix_short_keys_keep_everything() {
        assert_eq!(key_prefix("abc"), "abc...");
    }

    #[test]
    fn test_principal_serialization_shape() {
        let principal = Principal::ApiKey {
            key_prefix: "good_123...".to_string(),
        };
        let json = serde_json::to_value(&principal).unwrap();

        assert_eq!(json["type"], "api_key");
        assert_eq!(json["key_prefix"], "good_123...");
    }
}
