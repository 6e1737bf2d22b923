//! Request DTOs and JSON mapping helpers.
//!
//! Raw role strings are validated into the closed enum at this boundary;
//! an unrecognized value is rejected with a 400, never silently defaulted.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use fleetwise_auth::{Role, UserStatus};
use fleetwise_maintenance::{MaintenanceKind, MaintenanceStatus};
use fleetwise_vehicles::VehicleStatus;

use crate::app::errors;

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Vehicles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterVehicleRequest {
    pub license_plate: String,
    pub model: String,
    pub year: u16,
    #[serde(default)]
    pub fuel_level: u8,
}

#[derive(Debug, Deserialize)]
pub struct ChangeVehicleStatusRequest {
    pub status: VehicleStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    /// `None` unassigns the current driver.
    pub driver_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordFuelLevelRequest {
    pub fuel_level: u8,
}

#[derive(Debug, Deserialize)]
pub struct ListVehiclesQuery {
    pub status: Option<VehicleStatus>,
    pub search: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Maintenance
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScheduleMaintenanceRequest {
    pub vehicle_id: String,
    pub garage_id: Option<String>,
    pub kind: MaintenanceKind,
    pub description: String,
    pub scheduled_date: DateTime<Utc>,
    pub estimated_cost: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteWorkOrderRequest {
    pub actual_cost: Option<u64>,
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CancelWorkOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListWorkOrdersQuery {
    pub status: Option<MaintenanceStatus>,
    pub vehicle_id: Option<String>,
    pub search: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Garages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GarageDetailsRequest {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeGarageStatusRequest {
    pub status: fleetwise_garages::GarageStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListGaragesQuery {
    pub status: Option<fleetwise_garages::GarageStatus>,
    pub search: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub kind: Option<fleetwise_notifications::NotificationKind>,
    #[serde(default)]
    pub unread_only: bool,
    pub search: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Boundary validation helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_role(s: &str) -> Result<Role, axum::response::Response> {
    s.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_role",
            format!("role must be one of: admin, manager, mechanic, driver (got '{s}')"),
        )
    })
}

pub fn parse_user_status(s: &str) -> Result<UserStatus, axum::response::Response> {
    match s {
        "active" => Ok(UserStatus::Active),
        "inactive" => Ok(UserStatus::Inactive),
        _ => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be 'active' or 'inactive'",
        )),
    }
}
