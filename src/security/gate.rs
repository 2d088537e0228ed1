// ARCHITECTURE: Authentication Gate - Per-Request Identity Resolution
//
// Resolves the caller's identity from the raw credential headers, trying
// the API key first and the bearer session token second. A request that
// presents an invalid credential in either slot is rejected outright; it
// never falls through to anonymous handling. Each lookup acquires and
// releases its own component's lock, so the gate itself holds nothing
// across component boundaries.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::{ApiKeyStore, CredentialStore};
use crate::error::{Error, Result};

// CLASSIFICATION: which credential authenticated the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
    Session,
}

// CONTEXT: resolved identity bound to the request for downstream handlers
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub method: AuthMethod,
}

// CORE SYSTEM: AuthGate - credential header orchestration
pub struct AuthGate {
    credentials: Arc<CredentialStore>,
    api_keys: Arc<ApiKeyStore>,
}

impl AuthGate {
    pub fn new(credentials: Arc<CredentialStore>, api_keys: Arc<ApiKeyStore>) -> Self {
        Self {
            credentials,
            api_keys,
        }
    }

    // CORE FUNCTION: authenticate a request from its credential headers
    pub async fn authenticate(
        &self,
        api_key: Option<&str>,
        bearer_token: Option<&str>,
    ) -> Result<AuthContext> {
        if let Some(secret) = api_key.filter(|s| !s.is_empty()) {
            return self.authenticate_api_key(secret).await;
        }

        if let Some(token) = bearer_token.filter(|t| !t.is_empty()) {
            return self.authenticate_session(token).await;
        }

        debug!("Request presented no credentials");
        Err(Error::Unauthenticated)
    }

    async fn authenticate_api_key(&self, secret: &str) -> Result<AuthContext> {
        let key = match self.api_keys.validate(secret).await {
            Some(key) => key,
            None => {
                debug!("API key rejected");
                return Err(Error::Unauthenticated);
            }
        };

        // A key whose owner vanished authenticates nobody; degrade to
        // unauthenticated rather than failing the request pipeline.
        let user = match self.credentials.get_user(&key.user_id).await {
            Some(user) => user,
            None => {
                warn!(key_id = %key.id, "API key valid but owner record missing");
                return Err(Error::Unauthenticated);
            }
        };

        Ok(AuthContext {
            user_id: user.id,
            email: user.email,
            role: user.role,
            permissions: key.permissions,
            method: AuthMethod::ApiKey,
        })
    }

    async fn authenticate_session(&self, token: &str) -> Result<AuthContext> {
        let user = self.credentials.validate_session(token).await.map_err(|err| {
            debug!("Bearer token rejected");
            match err {
                Error::InvalidToken => Error::Unauthenticated,
                other => other,
            }
        })?;

        Ok(AuthContext {
            user_id: user.id,
            email: user.email,
            role: user.role,
            permissions: Vec::new(),
            method: AuthMethod::Session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::credentials::CredentialStoreConfig;

    async fn fixture() -> (Arc<CredentialStore>, Arc<ApiKeyStore>, AuthGate, String) {
        let credentials = Arc::new(CredentialStore::with_config(CredentialStoreConfig {
            session_ttl_seconds: 3600,
            bcrypt_cost: 4,
            seed_test_user: false,
        }));
        let api_keys = Arc::new(ApiKeyStore::new(365));

        let user = credentials
            .register("ops@netguard.io", "hunter2hunter2", "Ops", "NetGuard", "operator")
            .await
            .unwrap();

        let gate = AuthGate::new(Arc::clone(&credentials), Arc::clone(&api_keys));
        (credentials, api_keys, gate, user.id)
    }

    #[tokio::test]
    async fn test_api_key_takes_precedence() {
        let (_credentials, api_keys, gate, user_id) = fixture().await;
        let (secret, _) = api_keys
            .issue(&user_id, "automation", vec!["alerts:read".into()], None)
            .await;

        let context = gate.authenticate(Some(&secret), None).await.unwrap();

        assert_eq!(context.method, AuthMethod::ApiKey);
        assert_eq!(context.user_id, user_id);
        assert_eq!(context.permissions, vec!["alerts:read".to_string()]);
    }

    #[tokio::test]
    async fn test_bearer_token_authenticates_session() {
        let (credentials, _api_keys, gate, user_id) = fixture().await;
        let session = credentials.login("ops@netguard.io", "hunter2hunter2").await.unwrap();

        let context = gate.authenticate(None, Some(&session.token)).await.unwrap();

        assert_eq!(context.method, AuthMethod::Session);
        assert_eq!(context.user_id, user_id);
    }

    #[tokio::test]
    async fn test_invalid_api_key_rejects_despite_valid_bearer() {
        let (credentials, _api_keys, gate, _user_id) = fixture().await;
        let session = credentials.login("ops@netguard.io", "hunter2hunter2").await.unwrap();

        // A presented credential that fails must reject the request, not
        // fall through to the next slot.
        let result = gate
            .authenticate(Some("sk_bogus"), Some(&session.token))
            .await;

        assert!(matches!(result, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_no_credentials_is_unauthenticated() {
        let (_credentials, _api_keys, gate, _user_id) = fixture().await;

        assert!(matches!(
            gate.authenticate(None, None).await,
            Err(Error::Unauthenticated)
        ));
        assert!(matches!(
            gate.authenticate(Some(""), Some("")).await,
            Err(Error::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_unauthenticated() {
        let credentials = Arc::new(CredentialStore::with_config(CredentialStoreConfig {
            session_ttl_seconds: 0,
            bcrypt_cost: 4,
            seed_test_user: false,
        }));
        let api_keys = Arc::new(ApiKeyStore::new(365));
        credentials
            .register("ops@netguard.io", "hunter2hunter2", "Ops", "NetGuard", "operator")
            .await
            .unwrap();
        let session = credentials.login("ops@netguard.io", "hunter2hunter2").await.unwrap();
        let gate = AuthGate::new(Arc::clone(&credentials), api_keys);

        let result = gate.authenticate(None, Some(&session.token)).await;

        assert!(matches!(result, Err(Error::Unauthenticated)));
    }
}
