//! Opaque bearer sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{JsonStore, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Random 32-byte hex tokens mapped to the signed-in email.
#[derive(Clone)]
pub struct SessionStore {
    sessions: JsonStore<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(sessions: JsonStore<String, Session>, ttl_secs: u64) -> Self {
        Self {
            sessions,
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    pub fn open(data_dir: Option<&str>, ttl_secs: u64) -> Result<Self, StoreError> {
        Ok(Self::new(JsonStore::open("sessions", data_dir)?, ttl_secs))
    }

    pub fn create(&self, email: &str) -> String {
        let token = alloy::hex::encode(rand::random::<[u8; 32]>());
        self.sessions.insert(
            token.clone(),
            Session {
                email: email.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        token
    }

    /// Email behind a live token. Expired tokens are dropped on sight.
    pub fn resolve(&self, token: &str) -> Option<String> {
        let key = token.to_string();
        let session = self.sessions.get(&key)?;
        if session.expires_at <= Utc::now() {
            self.sessions.remove(&key);
            return None;
        }
        Some(session.email)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(&token.to_string()).is_some()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.sessions.save()
    }
}
