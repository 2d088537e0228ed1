use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::info;

use crate::AppState;

// GET /api/v1/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<Value> {
    let stats = state.response_cache.stats().await;
    Json(json!(stats))
}

// POST /api/v1/cache/clear
pub async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    state.response_cache.clear().await;
    info!("Response cache cleared");

    Json(json!({ "message": "Cache cleared" }))
}
