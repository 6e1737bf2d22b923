//! Directory-backed identity store.
//!
//! Bridges the user directory read model to the session layer. This is the
//! boundary where stored role/status strings are validated back into the
//! closed enums: an unrecognized stored role resolves to the documented
//! least-privilege default rather than leaking a raw string into policy
//! code.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use fleetwise_auth::{Role, UserStatus};
use fleetwise_core::UserId;
use fleetwise_session::{Actor, Credential, IdentityStore, ResolutionError};

use crate::projections::{UserReadModel, UsersProjection};
use crate::read_model::ReadStore;

/// Identity store over the user directory plus a credential map.
///
/// Passwords live beside, not inside, the directory read model: the read
/// model is disposable and rebuilt from events, credentials are not.
pub struct DirectoryIdentityStore<S> {
    users: Arc<UsersProjection<S>>,
    credentials: RwLock<HashMap<String, String>>,
}

impl<S> DirectoryIdentityStore<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    pub fn new(users: Arc<UsersProjection<S>>) -> Self {
        Self {
            users,
            credentials: RwLock::new(HashMap::new()),
        }
    }

    /// Set (or replace) the password for an email.
    pub fn set_password(&self, email: impl Into<String>, password: impl Into<String>) {
        if let Ok(mut credentials) = self.credentials.write() {
            credentials.insert(email.into().to_lowercase(), password.into());
        }
    }

    /// Resolve a user id to an actor with validated role/status.
    ///
    /// Used by bearer-session middleware so role changes and deactivation
    /// take effect on the next request, not the next sign-in.
    pub fn actor_by_id(&self, user_id: &UserId) -> Option<Actor> {
        self.users.get(user_id).map(|m| Self::actor_from_model(&m))
    }

    fn actor_from_model(model: &UserReadModel) -> Actor {
        let status = if model.status == UserStatus::Active.to_string() {
            UserStatus::Active
        } else {
            UserStatus::Inactive
        };

        Actor {
            id: model.user_id,
            email: model.email.clone(),
            role: Role::resolve_lenient(Some(&model.role)),
            status,
        }
    }
}

impl<S> IdentityStore for DirectoryIdentityStore<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    fn current_actor(&self) -> Result<Option<Actor>, ResolutionError> {
        // The directory holds no ambient session of its own; sessions are
        // established through `authenticate` and tracked by the caller.
        Ok(None)
    }

    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Actor, fleetwise_session::InvalidCredentialError> {
        let email = credential.email.to_lowercase();

        let stored = self
            .credentials
            .read()
            .ok()
            .and_then(|c| c.get(&email).cloned());

        match stored {
            Some(password) if password == credential.password => {}
            _ => return Err(fleetwise_session::InvalidCredentialError),
        }

        let model = self
            .users
            .find_by_email(&email)
            .ok_or(fleetwise_session::InvalidCredentialError)?;

        Ok(Self::actor_from_model(&model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryReadStore;
    use chrono::Utc;

    fn directory_with(
        email: &str,
        role: &str,
        status: &str,
    ) -> (Arc<DirectoryIdentityStore<Arc<InMemoryReadStore<UserId, UserReadModel>>>>, UserId) {
        let store: Arc<InMemoryReadStore<UserId, UserReadModel>> =
            Arc::new(InMemoryReadStore::new());
        let user_id = UserId::new();
        store.upsert(
            user_id,
            UserReadModel {
                user_id,
                email: email.to_string(),
                display_name: "Test User".to_string(),
                role: role.to_string(),
                status: status.to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        let users = Arc::new(UsersProjection::new(store));
        let identity = Arc::new(DirectoryIdentityStore::new(users));
        identity.set_password(email, "password");
        (identity, user_id)
    }

    fn credential(email: &str, password: &str) -> Credential {
        Credential {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn authenticate_resolves_a_validated_role() {
        let (identity, user_id) = directory_with("manager@fleetwise.example", "manager", "active");

        let actor = identity
            .authenticate(&credential("manager@fleetwise.example", "password"))
            .unwrap();
        assert_eq!(actor.id, user_id);
        assert_eq!(actor.role, Role::Manager);
        assert_eq!(actor.status, UserStatus::Active);
    }

    #[test]
    fn unrecognized_stored_role_falls_back_to_least_privilege() {
        let (identity, _) = directory_with("odd@fleetwise.example", "superuser", "active");

        let actor = identity
            .authenticate(&credential("odd@fleetwise.example", "password"))
            .unwrap();
        assert_eq!(actor.role, Role::Driver);
    }

    #[test]
    fn wrong_password_is_invalid_credential() {
        let (identity, _) = directory_with("user@fleetwise.example", "driver", "active");

        assert!(identity
            .authenticate(&credential("user@fleetwise.example", "wrong"))
            .is_err());
    }

    #[test]
    fn inactive_status_is_carried_on_the_actor() {
        let (identity, _) = directory_with("gone@fleetwise.example", "mechanic", "inactive");

        // The store resolves the actor (role assignment is independent of
        // activation); the session layer decides what inactive means.
        let actor = identity
            .authenticate(&credential("gone@fleetwise.example", "password"))
            .unwrap();
        assert_eq!(actor.status, UserStatus::Inactive);
        assert_eq!(actor.role, Role::Mechanic);
    }
}
