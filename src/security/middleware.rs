// ARCHITECTURE: Governance Middleware - Admission and Authentication Layers
//
// Two axum layers applied around the routing tree:
// 1. ADMISSION: sliding-window rate limiting by caller IP; every response
//    carries X-RateLimit-* headers, rejections get a 429 with usage detail
// 2. AUTHENTICATION: resolves the caller's identity through the auth gate
//    and binds the AuthContext to the request extensions for downstream
//    handlers

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::RateLimitStatus;
use crate::{AppState, error::Error};

pub const API_KEY_HEADER: &str = "x-api-key";

// Extract the caller IP the way the upstream proxy reports it.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

// Extract the session token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

fn apply_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    if let Ok(value) = HeaderValue::from_str(&status.limit.to_string()) {
        headers.insert("x-ratelimit-limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&status.remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", value);
    }
    if let Some(reset_at) = status.reset_at {
        if let Ok(value) = HeaderValue::from_str(&reset_at.to_rfc3339()) {
            headers.insert("x-ratelimit-reset", value);
        }
    }
}

// CORE FUNCTION: admission layer - admit or reject by caller IP
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.headers());

    if !state.rate_limiter.allow(&ip).await {
        let status = state.rate_limiter.status(&ip).await;
        warn!(ip = %ip, used = status.used, "Request rate limited");

        let mut response = Error::RateLimited {
            limit: status.limit,
            used: status.used,
            reset_at: status.reset_at,
        }
        .into_response();
        apply_rate_limit_headers(response.headers_mut(), &status);
        return response;
    }

    let status = state.rate_limiter.status(&ip).await;
    let mut response = next.run(request).await;
    apply_rate_limit_headers(response.headers_mut(), &status);
    response
}

// CORE FUNCTION: authentication layer - resolve identity, bind context
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let bearer = bearer_token(request.headers());

    match state
        .gate
        .authenticate(api_key.as_deref(), bearer.as_deref())
        .await
    {
        Ok(context) => {
            debug!(user_id = %context.user_id, method = ?context.method, "Request authenticated");
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());

        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "10.0.0.2");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn test_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
