//! Identity store contract and an in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleetwise_auth::{Role, UserStatus};
use fleetwise_core::UserId;

/// The authenticated (or resolvable) party.
///
/// Role assignment is independent of activation: an inactive actor still
/// resolves to a role, callers decide what inactive means for access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
}

impl Actor {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Sign-in credential.
#[derive(Clone, Deserialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

// Redact the password from debug output (credentials travel through
// request-scoped logging).
impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The identity store was unreachable during resolution.
///
/// Recoverable: callers treat this as "no actor" for rendering purposes and
/// may surface a transient notice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("identity store unreachable: {0}")]
pub struct ResolutionError(pub String);

/// The credential did not resolve to a known actor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid credentials")]
pub struct InvalidCredentialError;

/// Boundary toward whatever identity backend is in use.
///
/// Implementations may be a persisted-session lookup, a remote call, or an
/// in-memory directory; the session layer does not care which. Any backing
/// failure during resolution surfaces as [`ResolutionError`], never a panic.
pub trait IdentityStore: Send + Sync {
    /// The actor resolvable from a previously persisted session, if any.
    fn current_actor(&self) -> Result<Option<Actor>, ResolutionError>;

    /// Resolve a credential to a known actor.
    fn authenticate(&self, credential: &Credential) -> Result<Actor, InvalidCredentialError>;
}

/// In-memory identity directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    inner: RwLock<DirectoryState>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    actors: HashMap<String, (Actor, String)>,
    resumable: Option<Actor>,
    unreachable: bool,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor with its password, keyed by email.
    pub fn insert(&self, actor: Actor, password: impl Into<String>) {
        if let Ok(mut state) = self.inner.write() {
            state
                .actors
                .insert(actor.email.clone(), (actor, password.into()));
        }
    }

    /// Seed a persisted session so `current_actor` resolves without sign-in.
    pub fn set_resumable(&self, actor: Option<Actor>) {
        if let Ok(mut state) = self.inner.write() {
            state.resumable = actor;
        }
    }

    /// Simulate an unreachable backend (`current_actor` fails until cleared).
    pub fn set_unreachable(&self, unreachable: bool) {
        if let Ok(mut state) = self.inner.write() {
            state.unreachable = unreachable;
        }
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn current_actor(&self) -> Result<Option<Actor>, ResolutionError> {
        let state = self
            .inner
            .read()
            .map_err(|_| ResolutionError("lock poisoned".to_string()))?;
        if state.unreachable {
            return Err(ResolutionError("store offline".to_string()));
        }
        Ok(state.resumable.clone())
    }

    fn authenticate(&self, credential: &Credential) -> Result<Actor, InvalidCredentialError> {
        let state = self.inner.read().map_err(|_| InvalidCredentialError)?;
        match state.actors.get(&credential.email) {
            Some((actor, password)) if *password == credential.password => Ok(actor.clone()),
            _ => Err(InvalidCredentialError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(email: &str, role: Role) -> Actor {
        Actor {
            id: UserId::new(),
            email: email.to_string(),
            role,
            status: UserStatus::Active,
        }
    }

    #[test]
    fn authenticate_checks_email_and_password() {
        let store = InMemoryIdentityStore::new();
        store.insert(actor("admin@fleetwise.example", Role::Admin), "hunter2");

        let ok = store.authenticate(&Credential {
            email: "admin@fleetwise.example".to_string(),
            password: "hunter2".to_string(),
        });
        assert_eq!(ok.unwrap().role, Role::Admin);

        let bad_password = store.authenticate(&Credential {
            email: "admin@fleetwise.example".to_string(),
            password: "nope".to_string(),
        });
        assert!(bad_password.is_err());

        let unknown = store.authenticate(&Credential {
            email: "ghost@fleetwise.example".to_string(),
            password: "hunter2".to_string(),
        });
        assert!(unknown.is_err());
    }

    #[test]
    fn unreachable_store_surfaces_resolution_error() {
        let store = InMemoryIdentityStore::new();
        store.set_unreachable(true);
        assert!(store.current_actor().is_err());

        store.set_unreachable(false);
        assert_eq!(store.current_actor().unwrap(), None);
    }
}
