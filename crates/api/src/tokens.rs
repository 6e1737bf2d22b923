//! Bearer session tokens.
//!
//! A session token is an opaque UUID mapped to a user id. Tokens carry no
//! claims of their own: every request re-resolves the user from the
//! directory, so role changes and deactivation take effect immediately.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use fleetwise_core::UserId;

/// In-process session token registry.
#[derive(Debug, Default)]
pub struct SessionTokens {
    inner: RwLock<HashMap<Uuid, UserId>>,
}

impl SessionTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for a signed-in user.
    pub fn issue(&self, user_id: UserId) -> Uuid {
        let token = Uuid::now_v7();
        if let Ok(mut map) = self.inner.write() {
            map.insert(token, user_id);
        }
        token
    }

    /// Resolve a token to its user, if the session is still live.
    pub fn resolve(&self, token: &Uuid) -> Option<UserId> {
        self.inner.read().ok()?.get(token).copied()
    }

    /// Revoke a token. Idempotent: revoking an unknown token is a no-op.
    pub fn revoke(&self, token: &Uuid) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(token);
        }
    }
}
