//! Role → capability projection.
//!
//! The single policy table for page-level action flags. Pages and routes
//! consume these flags; they never recompute role sets ad hoc.

use serde::Serialize;

use crate::Role;

/// Baseline action flags granted to a role.
///
/// `can_maintain` covers scheduling and updating maintenance work. Drivers
/// additionally carry a row-level restriction (own vehicle only) that is
/// enforced by the data-access layer, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_add: bool,
    pub can_maintain: bool,
}

impl Role {
    /// Project this role into its capability flags.
    ///
    /// Pure and total: every role maps to a fully-populated flag set.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Role::Admin => Capabilities {
                can_view: true,
                can_edit: true,
                can_delete: true,
                can_add: true,
                can_maintain: true,
            },
            Role::Manager => Capabilities {
                can_view: true,
                can_edit: true,
                can_delete: false,
                can_add: true,
                can_maintain: true,
            },
            Role::Mechanic => Capabilities {
                can_view: true,
                can_edit: false,
                can_delete: false,
                can_add: false,
                can_maintain: true,
            },
            Role::Driver => Capabilities {
                can_view: true,
                can_edit: false,
                can_delete: false,
                can_add: false,
                can_maintain: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_can_view() {
        for role in Role::ALL {
            assert!(role.capabilities().can_view, "{role} lost view access");
        }
    }

    #[test]
    fn only_admin_can_delete() {
        for role in Role::ALL {
            assert_eq!(role.capabilities().can_delete, role == Role::Admin);
        }
    }

    #[test]
    fn driver_cannot_maintain_at_role_level() {
        assert!(!Role::Driver.capabilities().can_maintain);
        assert!(Role::Mechanic.capabilities().can_maintain);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_role() -> impl Strategy<Value = Role> {
            prop::sample::select(Role::ALL.to_vec())
        }

        proptest! {
            /// Projection is pure: repeated calls yield structurally equal flags.
            #[test]
            fn projection_is_pure(role in any_role()) {
                prop_assert_eq!(role.capabilities(), role.capabilities());
            }

            /// Edit implies add under the current table; delete implies edit.
            #[test]
            fn flag_lattice_holds(role in any_role()) {
                let caps = role.capabilities();
                if caps.can_delete {
                    prop_assert!(caps.can_edit);
                }
                if caps.can_edit {
                    prop_assert!(caps.can_add);
                }
            }
        }
    }
}
