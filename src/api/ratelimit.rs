use axum::{Json, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::{AppState, security::middleware::client_ip};

// GET /api/v1/ratelimit
//
// Read-only view of the caller's current admission window; querying it
// does not consume a slot.
pub async fn rate_limit_status(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let ip = client_ip(&headers);
    let status = state.rate_limiter.status(&ip).await;

    Json(json!({
        "ip": ip,
        "limit": status.limit,
        "used": status.used,
        "remaining": status.remaining,
        "reset": status.reset_at.map(|t| t.to_rfc3339()),
        "window_seconds": state.config.rate_limit.window_seconds,
    }))
}
