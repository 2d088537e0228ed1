use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    error::{Error, Result},
    security::AuthContext,
};

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    // Lifetime in days; the store default applies when absent.
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub enabled: Option<bool>,
}

// POST /api/v1/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    if request.name.is_empty() {
        return Err(Error::Validation("name is required"));
    }

    let (secret, key) = state
        .api_keys
        .issue(
            &context.user_id,
            &request.name,
            request.permissions,
            request.expires_in,
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": key.id,
            "key": secret,
            "name": key.name,
            "expires_at": key.expires_at,
            "message": "API key created successfully. Save this key securely, it won't be shown again.",
        })),
    ))
}

// GET /api/v1/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> Json<Value> {
    let keys = state.api_keys.list_for_user(&context.user_id).await;

    Json(json!({
        "api_keys": keys,
        "total": keys.len(),
    }))
}

// PUT /api/v1/api-keys/:id
pub async fn update_api_key(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(key_id): Path<String>,
    Json(request): Json<UpdateApiKeyRequest>,
) -> Result<Json<Value>> {
    state
        .api_keys
        .update(
            &key_id,
            &context.user_id,
            request.name.as_deref(),
            request.enabled,
        )
        .await?;

    Ok(Json(json!({
        "message": "API key updated successfully",
        "id": key_id,
    })))
}

// DELETE /api/v1/api-keys/:id
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Path(key_id): Path<String>,
) -> Result<Json<Value>> {
    state.api_keys.revoke(&key_id, &context.user_id).await?;

    Ok(Json(json!({
        "message": "API key revoked successfully",
        "id": key_id,
    })))
}
