//! Health and liveness endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns the served CAs and process uptime as JSON.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "default_ca": state.server.default_ca_name(),
        "cas": state.server.ca_names(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness check -- always returns 200 OK.
///
/// Does not touch any CA, so a CA whose database is down does not get the
/// process restarted.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}
