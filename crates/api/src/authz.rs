//! Route-level authorization guard.
//!
//! Routes declare a capability requirement and enforce it here before doing
//! any work, with the same membership rule the client-side access gate uses.
//! A denial names the roles that would have granted access.

use axum::http::StatusCode;

use fleetwise_auth::{Requirement, Role};
use fleetwise_session::{Actor, GateDecision, decide};

use crate::app::errors;

/// Check `actor` against a route's capability requirement.
///
/// Returns the ready-to-send denial response on failure so handlers can
/// `return` it directly.
pub fn require(actor: &Actor, requirement: &Requirement) -> Result<(), axum::response::Response> {
    match decide(Some(actor), requirement) {
        GateDecision::Granted => Ok(()),
        GateDecision::Unauthenticated => Err(errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "sign in to continue",
        )),
        GateDecision::Forbidden { accepted_roles } => Err(forbidden(&accepted_roles)),
    }
}

/// Derive a requirement from the capability policy table.
///
/// Keeps route guards anchored to the single `Capabilities` table instead of
/// hand-maintained role lists that drift.
pub fn roles_with(pred: impl Fn(&fleetwise_auth::Capabilities) -> bool) -> Requirement {
    Requirement::roles(Role::ALL.into_iter().filter(|r| pred(&r.capabilities())))
}

/// Build the 403 response for a role mismatch, naming the accepted roles.
pub fn forbidden(accepted_roles: &[Role]) -> axum::response::Response {
    let roles: Vec<&str> = accepted_roles.iter().map(|r| r.as_str()).collect();
    errors::json_error_with(
        StatusCode::FORBIDDEN,
        "forbidden",
        format!("this operation is restricted to roles: {}", roles.join(", ")),
        serde_json::json!({ "required_roles": roles }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwise_auth::UserStatus;
    use fleetwise_core::UserId;

    fn actor(role: Role) -> Actor {
        Actor {
            id: UserId::new(),
            email: format!("{role}@fleetwise.example"),
            role,
            status: UserStatus::Active,
        }
    }

    #[test]
    fn admin_passes_admin_requirement() {
        let requirement = Requirement::roles([Role::Admin]);
        assert!(require(&actor(Role::Admin), &requirement).is_ok());
    }

    #[test]
    fn mismatch_is_denied() {
        let requirement = Requirement::roles([Role::Admin, Role::Manager]);
        assert!(require(&actor(Role::Driver), &requirement).is_err());
    }

    #[test]
    fn empty_requirement_admits_all_roles() {
        let requirement = Requirement::any_authenticated();
        for role in Role::ALL {
            assert!(require(&actor(role), &requirement).is_ok());
        }
    }
}
