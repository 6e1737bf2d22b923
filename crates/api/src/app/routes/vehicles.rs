//! Fleet routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use fleetwise_auth::{Requirement, Role};
use fleetwise_core::{AggregateId, UserId};
use fleetwise_infra::projections::VehicleFilter;
use fleetwise_vehicles::{
    AssignDriver, ChangeVehicleStatus, RecordFuelLevel, RegisterVehicle, UnassignDriver, Vehicle,
    VehicleCommand, VehicleId,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_vehicles).post(register_vehicle))
        .route("/:id", get(get_vehicle))
        .route("/:id/status", post(change_status))
        .route("/:id/driver", post(assign_driver))
        .route("/:id/fuel", post(record_fuel))
}

fn parse_vehicle_id(id: &str) -> Result<VehicleId, axum::response::Response> {
    id.parse::<AggregateId>().map(VehicleId::new).map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid vehicle id")
    })
}

/// GET /vehicles?status=&search=
pub async fn list_vehicles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(query): Query<dto::ListVehiclesQuery>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &Requirement::any_authenticated()) {
        return denied;
    }

    let vehicles = services.vehicles.query(&VehicleFilter {
        status: query.status,
        driver_id: None,
        search: query.search,
    });

    (
        StatusCode::OK,
        Json(serde_json::json!({ "vehicles": vehicles })),
    )
        .into_response()
}

/// GET /vehicles/:id
pub async fn get_vehicle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &Requirement::any_authenticated()) {
        return denied;
    }

    let vehicle_id = match parse_vehicle_id(&id) {
        Ok(vehicle_id) => vehicle_id,
        Err(resp) => return resp,
    };

    match services.vehicles.get(&vehicle_id) {
        Some(vehicle) => {
            (StatusCode::OK, Json(serde_json::json!({ "vehicle": vehicle }))).into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "vehicle not found"),
    }
}

/// POST /vehicles
pub async fn register_vehicle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::RegisterVehicleRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &authz::roles_with(|c| c.can_add)) {
        return denied;
    }

    let aggregate_id = AggregateId::new();
    let vehicle_id = VehicleId::new(aggregate_id);

    let cmd = VehicleCommand::Register(RegisterVehicle {
        vehicle_id,
        license_plate: body.license_plate,
        model: body.model,
        year: body.year,
        fuel_level: body.fuel_level,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Vehicle>(aggregate_id, "fleet.vehicle", cmd, |_| {
        Vehicle::empty(vehicle_id)
    }) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": vehicle_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /vehicles/:id/status
pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeVehicleStatusRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &authz::roles_with(|c| c.can_edit)) {
        return denied;
    }

    let vehicle_id = match parse_vehicle_id(&id) {
        Ok(vehicle_id) => vehicle_id,
        Err(resp) => return resp,
    };

    let cmd = VehicleCommand::ChangeStatus(ChangeVehicleStatus {
        vehicle_id,
        status: body.status,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Vehicle>(vehicle_id.0, "fleet.vehicle", cmd, |_| {
        Vehicle::empty(vehicle_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /vehicles/:id/driver - assign (or unassign with null).
pub async fn assign_driver(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignDriverRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &authz::roles_with(|c| c.can_edit)) {
        return denied;
    }

    let vehicle_id = match parse_vehicle_id(&id) {
        Ok(vehicle_id) => vehicle_id,
        Err(resp) => return resp,
    };

    let cmd = match body.driver_id.as_deref() {
        Some(driver) => {
            let driver_id: UserId = match driver.parse() {
                Ok(driver_id) => driver_id,
                Err(_) => {
                    return errors::json_error(
                        StatusCode::BAD_REQUEST,
                        "invalid_id",
                        "invalid driver id",
                    );
                }
            };
            VehicleCommand::AssignDriver(AssignDriver {
                vehicle_id,
                driver_id,
                occurred_at: Utc::now(),
            })
        }
        None => VehicleCommand::UnassignDriver(UnassignDriver {
            vehicle_id,
            occurred_at: Utc::now(),
        }),
    };

    match services.dispatch::<Vehicle>(vehicle_id.0, "fleet.vehicle", cmd, |_| {
        Vehicle::empty(vehicle_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /vehicles/:id/fuel
///
/// Admins and managers may record fuel for any vehicle; a driver only for
/// the vehicle they are assigned to (row-level rule, enforced here against
/// the fleet read model).
pub async fn record_fuel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordFuelLevelRequest>,
) -> axum::response::Response {
    let vehicle_id = match parse_vehicle_id(&id) {
        Ok(vehicle_id) => vehicle_id,
        Err(resp) => return resp,
    };

    let actor = ctx.actor();
    let role_allows = actor.role.capabilities().can_edit;
    if !role_allows {
        let own_vehicle = actor.role == Role::Driver
            && services
                .vehicles
                .get(&vehicle_id)
                .is_some_and(|v| v.driver_id == Some(actor.id));
        if !own_vehicle {
            return authz::forbidden(&[Role::Admin, Role::Manager, Role::Driver]);
        }
    }

    let cmd = VehicleCommand::RecordFuelLevel(RecordFuelLevel {
        vehicle_id,
        fuel_level: body.fuel_level,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Vehicle>(vehicle_id.0, "fleet.vehicle", cmd, |_| {
        Vehicle::empty(vehicle_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
