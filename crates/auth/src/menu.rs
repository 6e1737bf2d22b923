//! Role → navigation projection.

use serde::Serialize;

use crate::Role;

/// A single navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub label: &'static str,
    pub target_route: &'static str,
}

impl MenuEntry {
    /// Whether this entry should render as active for `current_path`.
    ///
    /// The dashboard matches exactly (every other route starts with "/");
    /// other entries match by prefix so detail pages highlight their section.
    pub fn is_active_for(&self, current_path: &str) -> bool {
        if self.target_route == "/" {
            current_path == "/"
        } else {
            current_path.starts_with(self.target_route)
        }
    }
}

const DASHBOARD: MenuEntry = MenuEntry { label: "Dashboard", target_route: "/" };
const VEHICLES: MenuEntry = MenuEntry { label: "Vehicles", target_route: "/vehicles" };
const USERS: MenuEntry = MenuEntry { label: "Users", target_route: "/users" };
const MAINTENANCE: MenuEntry = MenuEntry { label: "Maintenance", target_route: "/maintenance" };
const GARAGES: MenuEntry = MenuEntry { label: "Garages", target_route: "/garages" };
const NOTIFICATIONS: MenuEntry = MenuEntry { label: "Notifications", target_route: "/notifications" };

/// Project a role into its ordered navigation entries.
///
/// Pure function of the role alone: the dashboard comes first for everyone,
/// then the role-specific sections. Managers see everything except user
/// administration; admins see everything.
pub fn project_menu(role: Role) -> Vec<MenuEntry> {
    match role {
        Role::Admin => vec![DASHBOARD, VEHICLES, USERS, MAINTENANCE, GARAGES, NOTIFICATIONS],
        Role::Manager => vec![DASHBOARD, VEHICLES, MAINTENANCE, GARAGES, NOTIFICATIONS],
        Role::Mechanic => vec![DASHBOARD, MAINTENANCE],
        Role::Driver => vec![DASHBOARD, VEHICLES, MAINTENANCE, NOTIFICATIONS],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_is_always_first() {
        for role in Role::ALL {
            assert_eq!(project_menu(role)[0], DASHBOARD);
        }
    }

    #[test]
    fn only_admin_sees_user_administration() {
        for role in Role::ALL {
            let has_users = project_menu(role).contains(&USERS);
            assert_eq!(has_users, role == Role::Admin, "{role}");
        }
    }

    #[test]
    fn mechanic_menu_is_maintenance_only() {
        assert_eq!(project_menu(Role::Mechanic), vec![DASHBOARD, MAINTENANCE]);
    }

    #[test]
    fn active_matching_is_prefix_based_except_dashboard() {
        assert!(DASHBOARD.is_active_for("/"));
        assert!(!DASHBOARD.is_active_for("/vehicles"));
        assert!(VEHICLES.is_active_for("/vehicles/42"));
        assert!(!VEHICLES.is_active_for("/garages"));
    }
}
