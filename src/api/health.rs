use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

pub async fn health_check() -> (StatusCode, Json<Value>) {
    let response = json!({
        "status": "healthy",
        "service": "netguard-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    (StatusCode::OK, Json(response))
}

pub async fn readiness_check() -> (StatusCode, Json<Value>) {
    // All state is in-memory; once the process serves traffic it is ready.
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}
