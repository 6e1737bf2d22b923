//! Users projection: the user directory read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_auth::{Role, UserEvent, UserStatus};
use fleetwise_core::UserId;
use fleetwise_events::EventEnvelope;

use crate::read_model::ReadStore;

/// User directory entry.
///
/// Role and status are kept in their stored string forms; consumers validate
/// them into the closed enums at the boundary (see the identity store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReadModel {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query filter for the user directory.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
}

/// Projection maintaining the user directory.
pub struct UsersProjection<S> {
    store: S,
}

impl<S> UsersProjection<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if !envelope.aggregate_type().starts_with("auth.user") {
            return Ok(());
        }

        let event: UserEvent = serde_json::from_value(envelope.payload().clone())?;

        match event {
            UserEvent::Created(e) => {
                self.store.upsert(
                    e.user_id,
                    UserReadModel {
                        user_id: e.user_id,
                        email: e.email,
                        display_name: e.display_name,
                        role: e.role.as_str().to_string(),
                        status: UserStatus::Active.to_string(),
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            UserEvent::RoleChanged(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.role = e.role.as_str().to_string();
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
            UserEvent::Deactivated(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.status = UserStatus::Inactive.to_string();
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
            UserEvent::Activated(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.status = UserStatus::Active.to_string();
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, user_id: &UserId) -> Option<UserReadModel> {
        self.store.get(user_id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<UserReadModel> {
        let email = email.to_lowercase();
        self.store.list().into_iter().find(|u| u.email == email)
    }

    /// List the directory, newest first, applying the filter.
    pub fn query(&self, filter: &UserFilter) -> Vec<UserReadModel> {
        let mut users: Vec<UserReadModel> = self
            .store
            .list()
            .into_iter()
            .filter(|u| {
                if let Some(role) = filter.role {
                    if u.role != role.as_str() {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if u.status != status.to_string() {
                        return false;
                    }
                }
                if let Some(search) = &filter.search {
                    if !super::matches_search(&[&u.email, &u.display_name], search) {
                        return false;
                    }
                }
                true
            })
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users
    }
}
