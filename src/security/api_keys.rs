// ARCHITECTURE: API Key Store - Long-Lived Credential Lifecycle
//
// Programmatic access credentials, keyed by their secret value:
// 1. ISSUANCE: the secret is generated with ~256 bits of entropy and
//    returned to the caller exactly once; listings only ever expose a
//    prefix
// 2. VALIDATION: unknown, disabled and expired keys are indistinguishable
//    to the caller; expired records stay in the store until revoked
// 3. LAST-USED TRACKING: recorded off the request path on a spawned task;
//    the timestamp is informational and may lag actual usage

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::random_token;
use crate::error::{Error, Result};

// RECORD: ApiKey - one issued key; `secret` doubles as the lookup key
#[derive(Debug, Clone, Serialize)]
pub struct ApiKey {
    pub id: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub name: String,
    pub user_id: String,
    pub permissions: Vec<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    // A disabled or expired key fails validation exactly like a missing one.
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.enabled && now < self.expires_at
    }
}

// VIEW: ApiKeySummary - listing entry with the secret redacted to a prefix
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeySummary {
    pub id: String,
    pub name: String,
    pub key_prefix: String,
    pub permissions: Vec<String>,
    pub enabled: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&ApiKey> for ApiKeySummary {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id.clone(),
            name: key.name.clone(),
            key_prefix: format!("{}...", &key.secret[..10.min(key.secret.len())]),
            permissions: key.permissions.clone(),
            enabled: key.enabled,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
            expires_at: key.expires_at,
        }
    }
}

// CORE SYSTEM: ApiKeyStore - issuance, validation, mutation, revocation
pub struct ApiKeyStore {
    default_ttl_days: i64,
    keys: Arc<RwLock<HashMap<String, ApiKey>>>,
}

impl ApiKeyStore {
    // CONSTRUCTOR: create store with the default TTL applied at issuance
    pub fn new(default_ttl_days: i64) -> Self {
        Self {
            default_ttl_days,
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    // CORE FUNCTION: issue a new key. Returns the raw secret alongside the
    // record; this is the only time the secret is handed out.
    pub async fn issue(
        &self,
        user_id: &str,
        name: &str,
        permissions: Vec<String>,
        ttl_days: Option<i64>,
    ) -> (String, ApiKey) {
        let secret = format!("sk_{}", random_token());
        let ttl_days = ttl_days.filter(|days| *days > 0).unwrap_or(self.default_ttl_days);

        let key = ApiKey {
            id: Uuid::new_v4().to_string(),
            secret: secret.clone(),
            name: name.to_string(),
            user_id: user_id.to_string(),
            permissions,
            enabled: true,
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::days(ttl_days),
            last_used_at: None,
        };

        self.keys.write().await.insert(secret.clone(), key.clone());

        info!(key_id = %key.id, user_id = %user_id, "API key issued");
        (secret, key)
    }

    // CORE FUNCTION: validate a presented secret. The last-used timestamp
    // is written by a spawned task so the validation path never waits on
    // the write lock.
    pub async fn validate(&self, secret: &str) -> Option<ApiKey> {
        let keys = self.keys.read().await;
        let key = keys.get(secret)?;

        if !key.is_valid(Utc::now()) {
            return None;
        }
        let key = key.clone();
        drop(keys);

        let keys = Arc::clone(&self.keys);
        let secret = secret.to_string();
        tokio::spawn(async move {
            if let Some(entry) = keys.write().await.get_mut(&secret) {
                entry.last_used_at = Some(Utc::now());
            }
        });

        Some(key)
    }

    // List a user's keys, secrets redacted.
    pub async fn list_for_user(&self, user_id: &str) -> Vec<ApiKeySummary> {
        self.keys
            .read()
            .await
            .values()
            .filter(|key| key.user_id == user_id)
            .map(ApiKeySummary::from)
            .collect()
    }

    // CORE FUNCTION: rename or enable/disable a key. Only the owner's keys
    // are visible to the operation; anything else is NotFound.
    pub async fn update(
        &self,
        key_id: &str,
        owner_user_id: &str,
        name: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<()> {
        let mut keys = self.keys.write().await;
        let key = keys
            .values_mut()
            .find(|key| key.id == key_id && key.user_id == owner_user_id)
            .ok_or(Error::NotFound("API key"))?;

        if let Some(name) = name {
            key.name = name.to_string();
        }
        if let Some(enabled) = enabled {
            key.enabled = enabled;
        }

        debug!(key_id = %key_id, "API key updated");
        Ok(())
    }

    // CORE FUNCTION: delete a key outright. Ownership is part of the
    // lookup; a non-owner sees NotFound and the key survives.
    pub async fn revoke(&self, key_id: &str, owner_user_id: &str) -> Result<()> {
        let mut keys = self.keys.write().await;

        let secret = keys
            .values()
            .find(|key| key.id == key_id && key.user_id == owner_user_id)
            .map(|key| key.secret.clone())
            .ok_or(Error::NotFound("API key"))?;

        keys.remove(&secret);
        drop(keys);

        info!(key_id = %key_id, "API key revoked");
        Ok(())
    }

    // Number of key records physically stored, expired ones included.
    pub async fn stored_keys(&self) -> usize {
        self.keys.read().await.len()
    }
}
