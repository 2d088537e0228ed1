use std::sync::Arc;

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod security;

pub use cache::TtlCache;
pub use config::GatewayConfig;
pub use error::{Error, Result};

use security::{ApiKeyStore, AuthGate, CredentialStore, RateLimiter};

// Shared application state handed to every handler and middleware layer.
// Each component owns its own lock internally; cloning the state only
// clones the Arc handles.
#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub rate_limiter: Arc<RateLimiter>,
    pub credentials: Arc<CredentialStore>,
    pub api_keys: Arc<ApiKeyStore>,
    pub gate: Arc<AuthGate>,
    pub response_cache: Arc<TtlCache<serde_json::Value>>,
}
