use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    AppState,
    error::{Error, Result},
    security::{AuthContext, middleware::bearer_token},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let session = state
        .credentials
        .login(&request.email, &request.password)
        .await?;
    let user = state
        .credentials
        .get_user(&session.user_id)
        .await
        .ok_or(Error::Internal)?;

    Ok(Json(json!({
        "token": session.token,
        "refresh_token": session.refresh_token,
        "expires_in": state.config.auth.session_ttl_hours * 3600,
        "user": user,
    })))
}

// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    if !request.email.contains('@') {
        return Err(Error::Validation("invalid email address"));
    }
    if request.password.len() < 8 {
        return Err(Error::Validation("password must be at least 8 characters"));
    }
    if request.name.is_empty() {
        return Err(Error::Validation("name is required"));
    }

    let user = state
        .credentials
        .register(
            &request.email,
            &request.password,
            &request.name,
            &request.company,
            &request.role,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user_id": user.id,
            "user": user,
        })),
    ))
}

// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<Value>> {
    let session = state.credentials.refresh(&request.refresh_token).await?;

    Ok(Json(json!({
        "token": session.token,
        "expires_in": state.config.auth.session_ttl_hours * 3600,
    })))
}

// POST /api/v1/auth/logout
//
// Deliberately lenient: logging out an already-dead token succeeds, so
// clients can always discard their credentials.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = bearer_token(&headers) {
        state.credentials.logout(&token).await;
        info!("User logged out");
    }

    Json(json!({ "message": "Logged out successfully" }))
}

// GET /api/v1/me
pub async fn me(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Value>> {
    let user = state
        .credentials
        .get_user(&context.user_id)
        .await
        .ok_or(Error::Unauthenticated)?;

    Ok(Json(json!({
        "user": user,
        "auth_method": context.method,
    })))
}
