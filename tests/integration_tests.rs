//! End-to-end tests driving the full HTTP stack.
//!
//! Each test boots the real application server on an ephemeral port and
//! exercises it over HTTP with `reqwest`, so the middleware ordering,
//! header contracts, and error body shapes are all verified as a client
//! would observe them.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, StatusCode};
use tokio::time::sleep;

use apiguard::{AppState, Config, build_router};

const TEST_KEY: &str = "good_1234567890";

/// Test fixture that serves the app on an ephemeral port.
struct TestServer {
    base_url: String,
    client: Client,
}

impl TestServer {
    async fn start(mut config: Config) -> Self {
        config.host = "127.0.0.1".to_string();
        // Metrics exporter is a global singleton; keep it out of tests
        config.metrics_port = 0;

        let state = AppState::new(config);
        let app = build_router(state).expect("Failed to build router");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind ephemeral port");
        let addr = listener.local_addr().expect("Failed to read local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server crashed");
        });

        let server = Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
        };
        server.wait_until_healthy().await;
        server
    }

    /// Poll /health until the server answers.
    ///
    /// Health requests are keyed by IP, not by the per-test API keys the
    /// actual assertions use, so polling does not skew keyed quotas.
    async fn wait_until_healthy(&self) {
        for _ in 0..50 {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await
                && resp.status() == StatusCode::OK
            {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
        panic!("Server did not become healthy in time");
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn health_endpoints_bypass_authentication() {
    let server = TestServer::start(Config {
        api_keys: vec![TEST_KEY.to_string()],
        ..Config::default()
    })
    .await;

    for path in ["/health", "/ready", "/live"] {
        let resp = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path} should bypass auth");
    }
}

#[tokio::test]
async fn missing_credentials_rejected_with_structured_body() {
    let server = TestServer::start(Config {
        api_keys: vec![TEST_KEY.to_string()],
        ..Config::default()
    })
    .await;

    let resp = server
        .client
        .get(server.url("/whoami"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers().get("www-authenticate").unwrap(),
        "Bearer",
        "401 must carry WWW-Authenticate: Bearer"
    );

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn invalid_api_key_rejected_with_same_error_code() {
    let server = TestServer::start(Config {
        api_keys: vec![TEST_KEY.to_string()],
        ..Config::default()
    })
    .await;

    let resp = server
        .client
        .get(server.url("/whoami"))
        .header("x-api-key", "definitely-wrong")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Same code as the missing-credential case; no oracle for key guessing
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn valid_api_key_yields_truncated_principal() {
    let server = TestServer::start(Config {
        api_keys: vec![TEST_KEY.to_string()],
        ..Config::default()
    })
    .await;

    let resp = server
        .client
        .get(server.url("/whoami"))
        .header("x-api-key", TEST_KEY)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["type"], "api_key");
    assert_eq!(body["key_prefix"], "good_123...");
}

#[tokio::test]
async fn bearer_token_always_fails_closed() {
    let server = TestServer::start(Config {
        api_keys: vec![TEST_KEY.to_string()],
        ..Config::default()
    })
    .await;

    let resp = server
        .client
        .get(server.url("/whoami"))
        .header("authorization", "Bearer some.jwt.token")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("not configured")
    );
}

#[tokio::test]
async fn invalid_key_fails_fast_before_bearer() {
    let server = TestServer::start(Config {
        api_keys: vec![TEST_KEY.to_string()],
        ..Config::default()
    })
    .await;

    let resp = server
        .client
        .get(server.url("/whoami"))
        .header("x-api-key", "bad-key")
        .header("authorization", "Bearer some.jwt.token")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // The key rejection wins; the bearer path is never consulted
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Invalid API key");
}

#[tokio::test]
async fn anonymous_principal_when_auth_disabled() {
    let server = TestServer::start(Config::default()).await;

    let resp = server
        .client
        .get(server.url("/whoami"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["type"], "anonymous");
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn global_rate_limit_rejects_over_quota() {
    let server = TestServer::start(Config {
        rate_limit_requests: 3,
        rate_limit_window_seconds: 60,
        ..Config::default()
    })
    .await;

    // A distinct API key isolates this client's identity from the
    // fixture's IP-keyed health polling
    let send = || {
        server
            .client
            .get(server.url("/whoami"))
            .header("x-api-key", "quota-client-1")
            .send()
    };

    for i in 0..3 {
        let resp = send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "request {} admitted", i + 1);

        let remaining: u32 = resp
            .headers()
            .get("x-ratelimit-remaining")
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(remaining, 2 - i, "remaining counts down");
        assert_eq!(resp.headers().get("x-ratelimit-limit").unwrap(), "3");
    }

    let resp = send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers().get("x-ratelimit-remaining").unwrap(), "0");

    let reset: i64 = resp
        .headers()
        .get("x-ratelimit-reset")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(reset >= unix_now() - 1, "reset timestamp is not in the past");

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn clients_have_independent_quotas() {
    let server = TestServer::start(Config {
        rate_limit_requests: 1,
        rate_limit_window_seconds: 60,
        ..Config::default()
    })
    .await;

    let send = |key: &'static str| {
        server
            .client
            .get(server.url("/whoami"))
            .header("x-api-key", key)
            .send()
    };

    assert_eq!(send("client-a").await.unwrap().status(), StatusCode::OK);
    assert_eq!(
        send("client-a").await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // A different identity is unaffected
    assert_eq!(send("client-b").await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn per_route_limit_is_independent_of_global() {
    let server = TestServer::start(Config {
        rate_limit_requests: 100,
        rate_limit_window_seconds: 60,
        route_limits: vec![apiguard::config::RouteLimit {
            path: "/whoami".to_string(),
            requests: 2,
            window_seconds: 60,
        }],
        ..Config::default()
    })
    .await;

    let send = || server.client.get(server.url("/whoami")).send();

    for _ in 0..2 {
        assert_eq!(send().await.unwrap().status(), StatusCode::OK);
    }

    // Route quota (2/60 keyed by path + IP) trips long before the global one
    let resp = send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("endpoint")
    );
}

#[tokio::test]
async fn rate_limit_headers_attached_to_admitted_responses() {
    let server = TestServer::start(Config::default()).await;

    let resp = server
        .client
        .get(server.url("/whoami"))
        .header("x-api-key", "headers-client")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-ratelimit-limit").unwrap(), "100");
    assert!(resp.headers().contains_key("x-ratelimit-remaining"));
    assert!(resp.headers().contains_key("x-ratelimit-reset"));
}

// =============================================================================
// Observability
// =============================================================================

#[tokio::test]
async fn request_id_generated_and_echoed() {
    let server = TestServer::start(Config::default()).await;

    let resp = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert!(resp.headers().contains_key("x-request-id"));

    let resp = server
        .client
        .get(server.url("/health"))
        .header("x-request-id", "my-correlation-id")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers().get("x-request-id").unwrap(),
        "my-correlation-id"
    );
}

#[tokio::test]
async fn health_reports_service_metadata() {
    let server = TestServer::start(Config::default()).await;

    let resp = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "apiguard");
    assert!(body["version"].as_str().unwrap().starts_with("0."));
}

#[tokio::test]
async fn readiness_reports_check_map() {
    let server = TestServer::start(Config::default()).await;

    let resp = server
        .client
        .get(server.url("/ready"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["rate_limit_store"], true);
}
