//! User aggregate for identity administration (event-sourced).
//!
//! Users carry exactly one role at a time. Role changes are restricted to
//! admin actors; activation is independent of role assignment (a deactivated
//! user still has a role, it just cannot sign in).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_core::{Aggregate, AggregateRoot, DomainError, UserId};
use fleetwise_events::Event;

use crate::Role;

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// User is active and can authenticate.
    #[default]
    Active,
    /// User is deactivated and cannot authenticate.
    Inactive,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// User aggregate.
///
/// # Invariants
/// - Exactly one role per user at any time.
/// - Only an admin actor may change another user's role.
/// - Deactivated users keep their role but cannot authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub status: UserStatus,
    pub version: u64,
    pub created: bool,
}

impl User {
    /// Create an empty, not-yet-created instance for rehydration.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            email: String::new(),
            display_name: String::new(),
            role: Role::DEFAULT,
            status: UserStatus::Active,
            version: 0,
            created: false,
        }
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command to change a user's role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRole {
    pub user_id: UserId,
    pub role: Role,
    /// Role of the actor performing the change (escalation check).
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Command to deactivate a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command to reactivate a deactivated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// All user commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserCommand {
    Create(CreateUser),
    ChangeRole(ChangeRole),
    Deactivate(DeactivateUser),
    Activate(ActivateUser),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleChanged {
    pub user_id: UserId,
    pub previous_role: Role,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeactivated {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivated {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// All user events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Created(UserCreated),
    RoleChanged(UserRoleChanged),
    Deactivated(UserDeactivated),
    Activated(UserActivated),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => "auth.user.created",
            UserEvent::RoleChanged(_) => "auth.user.role_changed",
            UserEvent::Deactivated(_) => "auth.user.deactivated",
            UserEvent::Activated(_) => "auth.user.activated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Created(e) => e.occurred_at,
            UserEvent::RoleChanged(e) => e.occurred_at,
            UserEvent::Deactivated(e) => e.occurred_at,
            UserEvent::Activated(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Created(e) => {
                self.id = e.user_id;
                self.email = e.email.clone();
                self.display_name = e.display_name.clone();
                self.role = e.role;
                self.status = UserStatus::Active;
                self.created = true;
            }
            UserEvent::RoleChanged(e) => {
                self.role = e.role;
            }
            UserEvent::Deactivated(_) => {
                self.status = UserStatus::Inactive;
            }
            UserEvent::Activated(_) => {
                self.status = UserStatus::Active;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Create(cmd) => self.handle_create(cmd),
            UserCommand::ChangeRole(cmd) => self.handle_change_role(cmd),
            UserCommand::Deactivate(cmd) => self.handle_deactivate(cmd),
            UserCommand::Activate(cmd) => self.handle_activate(cmd),
        }
    }
}

impl User {
    fn handle_create(&self, cmd: &CreateUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("user already exists"));
        }

        if cmd.email.trim().is_empty() || !cmd.email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        if cmd.display_name.trim().is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }

        Ok(vec![UserEvent::Created(UserCreated {
            user_id: cmd.user_id,
            email: cmd.email.trim().to_lowercase(),
            display_name: cmd.display_name.trim().to_string(),
            role: cmd.role,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_role(&self, cmd: &ChangeRole) -> Result<Vec<UserEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }

        if cmd.actor_role != Role::Admin {
            return Err(DomainError::Unauthorized);
        }

        if self.role == cmd.role {
            return Err(DomainError::invariant("role already assigned"));
        }

        Ok(vec![UserEvent::RoleChanged(UserRoleChanged {
            user_id: cmd.user_id,
            previous_role: self.role,
            role: cmd.role,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateUser) -> Result<Vec<UserEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }

        if self.status == UserStatus::Inactive {
            return Err(DomainError::invariant("user already inactive"));
        }

        Ok(vec![UserEvent::Deactivated(UserDeactivated {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateUser) -> Result<Vec<UserEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }

        if self.status == UserStatus::Active {
            return Err(DomainError::invariant("user already active"));
        }

        Ok(vec![UserEvent::Activated(UserActivated {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_user(role: Role) -> (UserId, User) {
        let user_id = UserId::new();
        let mut user = User::empty(user_id);
        let cmd = UserCommand::Create(CreateUser {
            user_id,
            email: "alice@fleetwise.example".to_string(),
            display_name: "Alice Martin".to_string(),
            role,
            occurred_at: now(),
        });
        for event in user.handle(&cmd).unwrap() {
            user.apply(&event);
        }
        (user_id, user)
    }

    #[test]
    fn create_user_success() {
        let user_id = UserId::new();
        let user = User::empty(user_id);

        let cmd = UserCommand::Create(CreateUser {
            user_id,
            email: "Alice@Fleetwise.Example".to_string(),
            display_name: "  Alice Martin  ".to_string(),
            role: Role::Driver,
            occurred_at: now(),
        });

        let events = user.handle(&cmd).unwrap();
        assert_eq!(events.len(), 1);

        let UserEvent::Created(e) = &events[0] else {
            panic!("expected UserCreated event");
        };

        assert_eq!(e.email, "alice@fleetwise.example");
        assert_eq!(e.display_name, "Alice Martin");
        assert_eq!(e.role, Role::Driver);
    }

    #[test]
    fn create_user_invalid_email() {
        let user_id = UserId::new();
        let user = User::empty(user_id);

        let cmd = UserCommand::Create(CreateUser {
            user_id,
            email: "not-an-email".to_string(),
            display_name: "Alice".to_string(),
            role: Role::Driver,
            occurred_at: now(),
        });

        assert!(user.handle(&cmd).is_err());
    }

    #[test]
    fn admin_can_change_role() {
        let (user_id, mut user) = created_user(Role::Driver);

        let cmd = UserCommand::ChangeRole(ChangeRole {
            user_id,
            role: Role::Mechanic,
            actor_role: Role::Admin,
            occurred_at: now(),
        });

        let events = user.handle(&cmd).unwrap();
        let UserEvent::RoleChanged(e) = &events[0] else {
            panic!("expected RoleChanged event");
        };
        assert_eq!(e.previous_role, Role::Driver);
        assert_eq!(e.role, Role::Mechanic);

        for event in events {
            user.apply(&event);
        }
        assert_eq!(user.role, Role::Mechanic);
        assert!(user.role.capabilities().can_maintain);
        assert!(!user.role.capabilities().can_edit);
    }

    #[test]
    fn non_admin_cannot_change_role() {
        let (user_id, user) = created_user(Role::Driver);

        for actor_role in [Role::Manager, Role::Mechanic, Role::Driver] {
            let cmd = UserCommand::ChangeRole(ChangeRole {
                user_id,
                role: Role::Admin,
                actor_role,
                occurred_at: now(),
            });

            let result = user.handle(&cmd);
            assert!(matches!(result.unwrap_err(), DomainError::Unauthorized));
        }
    }

    #[test]
    fn deactivated_user_keeps_role() {
        let (user_id, mut user) = created_user(Role::Mechanic);

        let cmd = UserCommand::Deactivate(DeactivateUser {
            user_id,
            occurred_at: now(),
        });
        for event in user.handle(&cmd).unwrap() {
            user.apply(&event);
        }

        assert_eq!(user.status, UserStatus::Inactive);
        assert_eq!(user.role, Role::Mechanic);
    }

    #[test]
    fn deactivate_twice_is_an_invariant_violation() {
        let (user_id, mut user) = created_user(Role::Driver);

        let cmd = UserCommand::Deactivate(DeactivateUser {
            user_id,
            occurred_at: now(),
        });
        for event in user.handle(&cmd).unwrap() {
            user.apply(&event);
        }

        let result = user.handle(&cmd);
        assert!(result.unwrap_err().to_string().contains("already inactive"));
    }

    #[test]
    fn activate_restores_a_deactivated_user() {
        let (user_id, mut user) = created_user(Role::Driver);

        for event in user
            .handle(&UserCommand::Deactivate(DeactivateUser {
                user_id,
                occurred_at: now(),
            }))
            .unwrap()
        {
            user.apply(&event);
        }
        assert_eq!(user.status, UserStatus::Inactive);

        for event in user
            .handle(&UserCommand::Activate(ActivateUser {
                user_id,
                occurred_at: now(),
            }))
            .unwrap()
        {
            user.apply(&event);
        }
        assert_eq!(user.status, UserStatus::Active);
    }
}
