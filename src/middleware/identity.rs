//! Client identity derivation for rate limiting.
//!
//! Two requests sharing the same derived identity share rate-limit
//! accounting. Derivation is deterministic per request and never empty.
//!
//! # Priority order
//!
//! 1. `X-API-Key` header → `key:` + first 16 characters of the key
//! 2. `X-Forwarded-For` header → `ip:` + first (client) entry in the list
//! 3. `X-Real-IP` header → `ip:` + value
//! 4. Direct peer address (Axum `ConnectInfo`) → `ip:` + peer IP
//! 5. Fallback → `ip:unknown`
//!
//! # Security Warning: IP Spoofing Risk
//!
//! The forwarding headers are client-controlled. Deploy behind a reverse
//! proxy that overwrites (not appends to) them, and block direct access to
//! this service, or attackers can rotate spoofed IPs to dodge the limiter.
//!
//! All requests without any identifiable source share the `ip:unknown` key,
//! so header-less traffic is collectively rate-limited rather than waved
//! through.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;

/// Fallback value when no client IP can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Number of API-key characters used in the derived identity.
///
/// Truncation keeps full keys out of the counter map while still giving
/// each key its own bucket.
const KEY_IDENTITY_LEN: usize = 16;

/// Extract the client IP from forwarding headers or the peer address.
///
/// Checks `X-Forwarded-For` (first entry), then `X-Real-IP`, then the
/// connection's peer address, falling back to [`UNKNOWN_IP`].
pub fn client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    // X-Forwarded-For: "client, proxy1, proxy2" - first entry is the client
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
        && !first.trim().is_empty()
    {
        return Cow::Owned(first.trim().to_string());
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
        && !value.trim().is_empty()
    {
        return Cow::Owned(value.trim().to_string());
    }

    // Direct peer address, present when served with connect info
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Cow::Owned(addr.ip().to_string());
    }

    Cow::Borrowed(UNKNOWN_IP)
}

/// Derive the rate-limit identity for the global per-identity scope.
///
/// An API key (truncated) takes priority over the IP, so keyed clients get
/// stable accounting across addresses.
pub fn client_identity<B>(req: &Request<B>) -> String {
    if let Some(header) = req.headers().get("x-api-key")
        && let Ok(key) = header.to_str()
        && !key.is_empty()
    {
        let truncated: String = key.chars().take(KEY_IDENTITY_LEN).collect();
        return format!("key:{truncated}");
    }

    format!("ip:{}", client_ip(req))
}

/// Derive the counter key for a per-route scope.
///
/// Keyed by route path + client IP (never the API key), so route scopes
/// stay independent of the global scope.
pub fn route_identity(path: &str, client_ip: &str) -> String {
    format!("route:{path}:{client_ip}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[test]
    fn test_client_ip_from_forwarded_for() {
        let req = Request::builder()
            .header("x-forwarded-for", "192.168.1.1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&req), "192.168.1.1");
    }

    #[test]
    fn test_client_ip_forwarded_for_beats_real_ip() {
        let req = Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-real-ip", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&req), "10.0.0.1");
    }

    #[test]
    fn test_client_ip_from_real_ip() {
        let req = Request::builder()
            .header("x-real-ip", "203.0.113.50")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_client_ip_from_peer_address() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        let addr: SocketAddr = "10.1.2.3:54321".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        assert_eq!(client_ip(&req), "10.1.2.3");
    }

    #[test]
    fn test_client_ip_unknown_fallback() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), UNKNOWN_IP);
    }

    #[test]
    fn test_client_ip_trims_whitespace() {
        let req = Request::builder()
            .header("x-forwarded-for", "  192.168.1.1  , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&req), "192.168.1.1");
    }

    #[test]
    fn test_client_ip_empty_forwarded_falls_through() {
        let req = Request::builder()
            .header("x-forwarded-for", "  ")
            .header("x-real-ip", "203.0.113.50")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_identity_prefers_api_key() {
        let req = Request::builder()
            .header("x-api-key", "secret-key-1234567890")
            .header("x-forwarded-for", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        // Truncated to 16 chars
        assert_eq!(client_identity(&req), "key:secret-key-12345");
    }

    #[test]
    fn test_identity_short_key_not_padded() {
        let req = Request::builder()
            .header("x-api-key", "abc")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_identity(&req), "key:abc");
    }

    #[test]
    fn test_identity_falls_back_to_ip() {
        let req = Request::builder()
            .header("x-forwarded-for", "192.168.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(client_identity(&req), "ip:192.168.1.1");
    }

    #[test]
    fn test_identity_never_empty() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_identity(&req), "ip:unknown");
    }

    #[test]
    fn test_route_identity_format() {
        assert_eq!(
            route_identity("/whoami", "192.168.1.1"),
            "route:/whoami:192.168.1.1"
        );
    }
}
