//! Application configuration loaded from environment variables.
//!
//! # Security Configuration
//!
//! - `API_KEYS`: Comma-separated list of valid API keys. When set, all
//!   endpoints except the bypass paths require a key.
//! - `AUTH_BYPASS_PATHS`: Paths that skip authentication (default:
//!   `/health,/ready,/live` for orchestrator probes).
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_REQUESTS`: Max requests per window per client (default: 100,
//!   0 disables the global limiter)
//! - `RATE_LIMIT_WINDOW_SECONDS`: Sliding window length (default: 60)
//! - `ROUTE_RATE_LIMITS`: Per-route overrides as comma-separated
//!   `path=requests:window` entries, e.g. `/whoami=10:60,/search=5:30`
//! - `MAX_TRACKED_IDENTITIES`: Cap on tracked client identities (default: 10000)

use std::env;

use crate::error::{AppError, AppResult};
use crate::rate_limit::DEFAULT_MAX_TRACKED_IDENTITIES;

/// Default paths that bypass authentication.
///
/// Matching is exact and case-sensitive against the request path; this
/// strictness prevents accidental bypasses via path manipulation.
const DEFAULT_BYPASS_PATHS: &str = "/health,/ready,/live";

/// Per-route rate-limit override.
///
/// Route-scoped counters are keyed by `route_path + client_ip` and never
/// share state with the global per-identity scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteLimit {
    /// Route path, exact match (e.g. "/whoami").
    pub path: String,
    /// Max requests per window for this route.
    pub requests: u32,
    /// Window length in seconds.
    pub window_seconds: u32,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8000)
    pub port: u16,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Valid API keys. Empty = authentication disabled.
    /// Clients pass a key via the `X-API-Key` header.
    pub api_keys: Vec<String>,

    /// Paths that bypass authentication (health probes, monitoring).
    pub auth_bypass_paths: Vec<String>,

    /// Comma-separated list of allowed CORS origins ("*" = any).
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Max requests per window per client identity (default: 100).
    /// Set to 0 to disable the global limiter.
    pub rate_limit_requests: u32,

    /// Sliding window length in seconds (default: 60).
    pub rate_limit_window_seconds: u32,

    /// Per-route overrides, applied only to routes listed here.
    pub route_limits: Vec<RouteLimit>,

    /// Cap on the number of tracked client identities.
    pub max_tracked_identities: usize,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for the Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value is invalid (non-numeric
    /// port, zero-length window, malformed route override).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 8000)?,

            api_keys: Self::parse_list("API_KEYS", ""),
            auth_bypass_paths: Self::parse_list("AUTH_BYPASS_PATHS", DEFAULT_BYPASS_PATHS),
            cors_allowed_origins: Self::parse_list("CORS_ALLOWED_ORIGINS", "*"),

            rate_limit_requests: Self::parse_env("RATE_LIMIT_REQUESTS", 100)?,
            rate_limit_window_seconds: Self::parse_env("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            route_limits: Self::parse_route_limits()?,
            max_tracked_identities: Self::parse_env(
                "MAX_TRACKED_IDENTITIES",
                DEFAULT_MAX_TRACKED_IDENTITIES,
            )?,

            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.rate_limit_requests > 0 && self.rate_limit_window_seconds == 0 {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_WINDOW_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.max_tracked_identities == 0 {
            return Err(AppError::ConfigError(
                "MAX_TRACKED_IDENTITIES must be greater than 0".to_string(),
            ));
        }

        for route in &self.route_limits {
            if !route.path.starts_with('/') {
                return Err(AppError::ConfigError(format!(
                    "ROUTE_RATE_LIMITS path must start with '/': {}",
                    route.path
                )));
            }
            if route.requests == 0 || route.window_seconds == 0 {
                return Err(AppError::ConfigError(format!(
                    "ROUTE_RATE_LIMITS for {} must have requests > 0 and window > 0",
                    route.path
                )));
            }
        }

        for path in &self.auth_bypass_paths {
            if !path.starts_with('/') {
                return Err(AppError::ConfigError(format!(
                    "AUTH_BYPASS_PATHS entry must start with '/': {path}"
                )));
            }
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if global rate limiting is enabled.
    pub fn rate_limiting_enabled(&self) -> bool {
        self.rate_limit_requests > 0
    }

    /// Check if API key authentication is enabled.
    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// Look up a per-route override by exact path.
    pub fn route_limit(&self, path: &str) -> Option<&RouteLimit> {
        self.route_limits.iter().find(|r| r.path == path)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address, or `None` if disabled.
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a comma-separated environment variable into a trimmed list.
    fn parse_list(name: &str, default: &str) -> Vec<String> {
        env::var(name)
            .unwrap_or_else(|_| default.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Parse per-route overrides from `ROUTE_RATE_LIMITS`.
    ///
    /// Format: comma-separated `path=requests:window` entries.
    fn parse_route_limits() -> AppResult<Vec<RouteLimit>> {
        let raw = match env::var("ROUTE_RATE_LIMITS") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => return Ok(Vec::new()),
        };

        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse_route_limit)
            .collect()
    }

    fn parse_route_limit(entry: &str) -> AppResult<RouteLimit> {
        let malformed = || {
            AppError::ConfigError(format!(
                "Invalid ROUTE_RATE_LIMITS entry '{entry}', expected path=requests:window"
            ))
        };

        let (path, limits) = entry.split_once('=').ok_or_else(malformed)?;
        let (requests, window) = limits.split_once(':').ok_or_else(malformed)?;

        Ok(RouteLimit {
            path: path.trim().to_string(),
            requests: requests.trim().parse().map_err(|_| malformed())?,
            window_seconds: window.trim().parse().map_err(|_| malformed())?,
        })
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_keys: vec![],
            auth_bypass_paths: DEFAULT_BYPASS_PATHS
                .split(',')
                .map(str::to_string)
                .collect(),
            cors_allowed_origins: vec!["*".to_string()],
            rate_limit_requests: 100,
            rate_limit_window_seconds: 60,
            route_limits: vec![],
            max_tracked_identities: DEFAULT_MAX_TRACKED_IDENTITIES,
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}
