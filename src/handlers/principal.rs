//! Principal echo endpoint.
//!
//! `GET /whoami` returns the authenticated-caller descriptor the auth
//! middleware attached to the request, making the credential chain
//! observable end to end:
//!
//! ```json
//! {"type": "api_key", "key_prefix": "good_123..."}
//! ```

use axum::{Extension, Json};
use serde_json::json;
use tracing::instrument;

use crate::auth::Principal;

/// Return the caller's principal.
///
/// When authentication is disabled no principal is attached; the caller is
/// reported as anonymous rather than failing.
#[instrument(skip(principal))]
pub async fn whoami(principal: Option<Extension<Principal>>) -> Json<serde_json::Value> {
    match principal {
        Some(Extension(principal)) => {
            Json(serde_json::to_value(&principal).unwrap_or_else(|_| json!({"type": "unknown"})))
        }
        None => Json(json!({"type": "anonymous"})),
    }
}
