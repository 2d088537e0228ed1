// ARCHITECTURE: Credential Store - Users and Session Lifecycle
//
// Holds user records and active sessions behind component-owned locks:
// 1. USERS: registered accounts keyed by email (case-sensitive), password
//    hashes never leave this module
// 2. SESSIONS: one Session object per issued token pair, stored once and
//    referenced by two independent indexes (access token and refresh
//    token); logout or expiry discovery drops the session and BOTH index
//    entries pointing at it
// 3. REFRESH: issues a brand-new session bound to the same user and
//    refresh token; existing sessions are never mutated in place
//
// Session state machine: issued -> valid -> {expired | revoked}, with no
// way back to valid.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::random_token;
use crate::error::{Error, Result};

// CONFIGURATION: CredentialStoreConfig - session and hashing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialStoreConfig {
    pub session_ttl_seconds: i64,  // Access token lifetime (default: 24h)
    pub bcrypt_cost: u32,          // Password hashing cost factor (default: 10)
    pub seed_test_user: bool,      // Seed a default account when the store is empty
}

impl Default for CredentialStoreConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 24 * 60 * 60,
            bcrypt_cost: 10,
            seed_test_user: true,
        }
    }
}

// RECORD: User - registered account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub company: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// RECORD: Session - one issued token pair
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// The three maps move together under one lock: sessions by id, plus the
// access-token and refresh-token indexes into them.
#[derive(Default)]
struct SessionTable {
    sessions: HashMap<String, Session>,
    access_index: HashMap<String, String>,
    refresh_index: HashMap<String, String>,
}

impl SessionTable {
    fn insert(&mut self, session: Session) {
        self.access_index
            .insert(session.token.clone(), session.id.clone());
        self.refresh_index
            .insert(session.refresh_token.clone(), session.id.clone());
        self.sessions.insert(session.id.clone(), session);
    }

    // Drop a session and whichever index entries still point at it. An
    // index entry repointed to a newer session (by refresh) is left alone.
    fn remove(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.remove(session_id) {
            if self.access_index.get(&session.token).map(String::as_str) == Some(session_id) {
                self.access_index.remove(&session.token);
            }
            if self
                .refresh_index
                .get(&session.refresh_token)
                .map(String::as_str)
                == Some(session_id)
            {
                self.refresh_index.remove(&session.refresh_token);
            }
        }
    }
}

// CORE SYSTEM: CredentialStore - user accounts and session issuance
pub struct CredentialStore {
    config: CredentialStoreConfig,
    users: Arc<RwLock<HashMap<String, User>>>,
    table: Arc<RwLock<SessionTable>>,
}

impl CredentialStore {
    // CONSTRUCTOR: create credential store with default configuration
    pub fn new() -> Self {
        Self::with_config(CredentialStoreConfig::default())
    }

    // CONSTRUCTOR: create credential store with custom configuration
    pub fn with_config(config: CredentialStoreConfig) -> Self {
        Self {
            config,
            users: Arc::new(RwLock::new(HashMap::new())),
            table: Arc::new(RwLock::new(SessionTable::default())),
        }
    }

    fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.config.session_ttl_seconds)
    }

    // LIFECYCLE: seed the default account when the store starts empty
    pub async fn start(&self) -> Result<()> {
        if self.config.seed_test_user && self.users.read().await.is_empty() {
            self.register(
                "test@example.com",
                "password123",
                "Test User",
                "Test Company",
                "admin",
            )
            .await?;

            warn!(
                email = "test@example.com",
                "Seeded default test user. Disable SEED_TEST_USER outside development!"
            );
        }

        info!("Credential store started");
        Ok(())
    }

    // CORE FUNCTION: register a new account; the email is the unique key
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        company: &str,
        role: &str,
    ) -> Result<User> {
        if self.users.read().await.contains_key(email) {
            return Err(Error::AlreadyExists);
        }

        let password_hash =
            bcrypt::hash(password, self.config.bcrypt_cost).map_err(|_| Error::Internal)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash,
            company: company.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        };

        // Re-check under the write lock: a concurrent registration for the
        // same email may have landed while the hash was computed.
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(Error::AlreadyExists);
        }
        users.insert(email.to_string(), user.clone());
        drop(users);

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    // CORE FUNCTION: authenticate by email and password, issue a session.
    // Absent user and hash mismatch are indistinguishable to the caller;
    // bcrypt's verify does the constant-time comparison.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let user = self
            .users
            .read()
            .await
            .get(email)
            .cloned()
            .ok_or(Error::InvalidCredentials)?;

        if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
            debug!(email = %email, "Password mismatch on login");
            return Err(Error::InvalidCredentials);
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            token: random_token(),
            refresh_token: random_token(),
            user_id: user.id.clone(),
            expires_at: Utc::now() + self.session_ttl(),
        };

        self.table.write().await.insert(session.clone());

        info!(user_id = %user.id, "Session issued");
        Ok(session)
    }

    // CORE FUNCTION: exchange a refresh token for a new access token.
    // Issues a fresh session sharing the same refresh token and user; the
    // old access token remains valid until its own expiry.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let mut table = self.table.write().await;

        let session_id = table
            .refresh_index
            .get(refresh_token)
            .cloned()
            .ok_or(Error::InvalidToken)?;

        let current = match table.sessions.get(&session_id) {
            Some(session) => session.clone(),
            None => {
                // Index entry with no session behind it; repair and reject.
                table.refresh_index.remove(refresh_token);
                return Err(Error::InvalidToken);
            }
        };

        if current.is_expired(Utc::now()) {
            table.remove(&session_id);
            return Err(Error::InvalidToken);
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            token: random_token(),
            refresh_token: refresh_token.to_string(),
            user_id: current.user_id,
            expires_at: Utc::now() + self.session_ttl(),
        };
        table.insert(session.clone());
        drop(table);

        debug!(user_id = %session.user_id, "Session refreshed");
        Ok(session)
    }

    // CORE FUNCTION: revoke the session behind either of its tokens.
    // Both the access and refresh index entries die with it. Idempotent:
    // an unknown token is a no-op.
    pub async fn logout(&self, token: &str) {
        let mut table = self.table.write().await;

        let session_id = table
            .access_index
            .get(token)
            .or_else(|| table.refresh_index.get(token))
            .cloned();

        if let Some(session_id) = session_id {
            table.remove(&session_id);
            debug!("Session revoked");
        }
    }

    // CORE FUNCTION: resolve an access token to its user. Expiry discovery
    // eagerly deletes the session; a valid session whose user record is
    // missing degrades to Unauthenticated instead of failing the pipeline.
    pub async fn validate_session(&self, token: &str) -> Result<User> {
        let table = self.table.read().await;
        let session = table
            .access_index
            .get(token)
            .and_then(|id| table.sessions.get(id))
            .cloned();
        drop(table);

        let session = session.ok_or(Error::InvalidToken)?;

        if session.is_expired(Utc::now()) {
            self.table.write().await.remove(&session.id);
            return Err(Error::InvalidToken);
        }

        match self.get_user(&session.user_id).await {
            Some(user) => Ok(user),
            None => {
                warn!(user_id = %session.user_id, "Session resolved but user record missing");
                Err(Error::Unauthenticated)
            }
        }
    }

    // Look up a user by id (users are keyed by email; id lookups scan).
    pub async fn get_user(&self, user_id: &str) -> Option<User> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.id == user_id)
            .cloned()
    }

    // Number of live session objects (both indexes point into these).
    pub async fn active_sessions(&self) -> usize {
        self.table.read().await.sessions.len()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
