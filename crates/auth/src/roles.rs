use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role identifier used for RBAC.
///
/// The role set is closed: raw strings are validated into this enum at the
/// boundary (sign-in, role assignment, stored-value resolution) and policy
/// code only ever sees a `Role`. There is no structural hierarchy; checks are
/// by explicit set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Mechanic,
    Driver,
}

/// A role string did not name any known role.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct RoleParseError(pub String);

impl Role {
    /// All roles, in display order.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Mechanic, Role::Driver];

    /// Fallback applied when *resolving* a stored value that is missing or
    /// unrecognized: least privilege.
    ///
    /// Explicit role assignment must never fall back here; it is rejected
    /// with [`RoleParseError`] instead.
    pub const DEFAULT: Role = Role::Driver;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Mechanic => "mechanic",
            Role::Driver => "driver",
        }
    }

    /// Resolve a stored role value, falling back to [`Role::DEFAULT`] when
    /// the value is missing or unrecognized.
    pub fn resolve_lenient(value: Option<&str>) -> Role {
        value
            .and_then(|s| s.parse().ok())
            .unwrap_or(Role::DEFAULT)
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "mechanic" => Ok(Role::Mechanic),
            "driver" => Ok(Role::Driver),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_role() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("MECHANIC".parse::<Role>().unwrap(), Role::Mechanic);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err, RoleParseError("superuser".to_string()));
    }

    #[test]
    fn lenient_resolution_defaults_to_driver() {
        assert_eq!(Role::resolve_lenient(None), Role::Driver);
        assert_eq!(Role::resolve_lenient(Some("???")), Role::Driver);
        assert_eq!(Role::resolve_lenient(Some("manager")), Role::Manager);
    }
}
