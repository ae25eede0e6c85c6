//! Login sessions: opaque cookie tokens mapped to logged-in users.
//!
//! ARCHITECTURE
//! ============
//! Logins live in memory only; restarting the process logs everyone out.
//! Each login remembers which chat session the user currently has open.
//! That id is the only per-user state the server keeps between requests;
//! the chat sessions themselves always come from disk.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tokio::sync::RwLock;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// User attached to a login token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginUser {
    pub username: String,
    pub is_admin: bool,
    /// Chat session the user is looking at. May not exist on disk yet.
    pub current_session: String,
}

/// Token -> login map shared by all handlers.
#[derive(Clone, Default)]
pub struct LoginRegistry {
    inner: Arc<RwLock<HashMap<String, LoginUser>>>,
}

impl LoginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a login and return its token.
    pub async fn create(&self, user: LoginUser) -> String {
        let token = generate_token();
        self.inner.write().await.insert(token.clone(), user);
        token
    }

    pub async fn get(&self, token: &str) -> Option<LoginUser> {
        self.inner.read().await.get(token).cloned()
    }

    /// Point the login at another chat session. Returns `false` for unknown tokens.
    pub async fn set_current(&self, token: &str, session_id: &str) -> bool {
        let mut logins = self.inner.write().await;
        let Some(user) = logins.get_mut(token) else {
            return false;
        };
        session_id.clone_into(&mut user.current_session);
        true
    }

    /// Drop a login. Returns `true` if the token was known.
    pub async fn remove(&self, token: &str) -> bool {
        self.inner.write().await.remove(token).is_some()
    }

    /// Number of active logins.
    pub async fn active_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
