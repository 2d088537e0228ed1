use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

// RateLimited and Unauthenticated are frequent, expected outcomes; both
// are allocation-free variants so rejection stays cheap.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User with this email already exists")]
    AlreadyExists,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication required. Provide a valid session token or API key")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Rate limit exceeded")]
    RateLimited {
        limit: usize,
        used: usize,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("Validation error: {0}")]
    Validation(&'static str),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::AlreadyExists => StatusCode::CONFLICT,
            Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            Error::RateLimited {
                limit,
                used,
                reset_at,
            } => Json(json!({
                "error": self.to_string(),
                "message": "Too many requests. Please try again later.",
                "limit": limit,
                "used": used,
                "reset": reset_at.map(|t| t.to_rfc3339()),
                "status": status.as_u16()
            })),
            _ => Json(json!({
                "error": self.to_string(),
                "status": status.as_u16()
            })),
        };

        (status, body).into_response()
    }
}
