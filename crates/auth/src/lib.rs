//! `fleetwise-auth` — pure access-control policy.
//!
//! This crate is intentionally decoupled from HTTP, storage, and session
//! state: roles, capability projection, route requirements, and navigation
//! projection are all deterministic functions over the closed [`Role`] enum.

pub mod capabilities;
pub mod menu;
pub mod requirement;
pub mod roles;
pub mod user;

pub use capabilities::Capabilities;
pub use menu::{MenuEntry, project_menu};
pub use requirement::Requirement;
pub use roles::{Role, RoleParseError};
pub use user::{
    ActivateUser, ChangeRole, CreateUser, DeactivateUser, User, UserActivated, UserCommand,
    UserCreated, UserDeactivated, UserEvent, UserRoleChanged, UserStatus,
};
