//! API response body types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response body for `GET /health` and `GET /live`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "alive"
    pub status: String,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Seconds since the process started
    pub uptime_seconds: u64,
    /// Current server time (RFC3339)
    pub timestamp: DateTime<Utc>,
}

/// Response body for `GET /ready`.
///
/// `checks` maps each dependency to its probe result; the overall status is
/// "ready" only when every check passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: BTreeMap<String, bool>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            service: "apiguard".to_string(),
            version: "0.1.0".to_string(),
            uptime_seconds: 42,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["uptime_seconds"], 42);
    }

    #[test]
    fn test_readiness_response_serialization() {
        let mut checks = BTreeMap::new();
        checks.insert("rate_limit_store".to_string(), true);

        let response = ReadinessResponse {
            status: "ready".to_string(),
            checks,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["checks"]["rate_limit_store"], true);
    }
}
