//! Capability requirements for protected views/routes.

use serde::{Deserialize, Serialize};

use crate::Role;

/// The set of roles permitted to enter a protected view.
///
/// An empty set means "any authenticated actor". Evaluation is by exact
/// membership over the closed role enum, never by hierarchy inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Requirement(Vec<Role>);

impl Requirement {
    /// Any authenticated actor may enter.
    pub fn any_authenticated() -> Self {
        Self(Vec::new())
    }

    /// Only the given roles may enter.
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut roles: Vec<Role> = roles.into_iter().collect();
        roles.dedup();
        Self(roles)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `role` satisfies this requirement.
    pub fn allows(&self, role: Role) -> bool {
        self.0.is_empty() || self.0.contains(&role)
    }

    /// The roles that would grant access, for denial messages.
    pub fn accepted_roles(&self) -> &[Role] {
        &self.0
    }
}

impl From<&[Role]> for Requirement {
    fn from(roles: &[Role]) -> Self {
        Self::roles(roles.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_requirement_allows_every_role() {
        let req = Requirement::any_authenticated();
        for role in Role::ALL {
            assert!(req.allows(role));
        }
    }

    #[test]
    fn membership_is_exact() {
        let req = Requirement::roles([Role::Admin, Role::Manager]);
        assert!(req.allows(Role::Admin));
        assert!(req.allows(Role::Manager));
        assert!(!req.allows(Role::Mechanic));
        assert!(!req.allows(Role::Driver));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_role() -> impl Strategy<Value = Role> {
            prop::sample::select(Role::ALL.to_vec())
        }

        proptest! {
            /// allows(r) ⇔ requirement empty ∨ r ∈ requirement.
            #[test]
            fn allows_iff_member_or_empty(
                role in any_role(),
                required in prop::collection::vec(any_role(), 0..4),
            ) {
                let req = Requirement::roles(required.clone());
                let expected = required.is_empty() || required.contains(&role);
                prop_assert_eq!(req.allows(role), expected);
            }
        }
    }
}
