//! Garage directory routes.

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
use fleetwise_core::AggregateId;
use fleetwise_garages::{
    ChangeGarageStatus, Garage, GarageCommand, GarageId, GarageStatus, RegisterGarage,
    UpdateGarageDetails,
};
use fleetwise_infra::projections::GarageFilter;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_garages).post(register_garage))
        .route("/:id", get(get_garage).delete(decommission_garage))
        .route("/:id/details", post(update_details))
        .route("/:id/status", post(change_status))
}

/// Drivers have no garage view; everyone else reads the directory.
fn directory_readers() -> Requirement {
    Requirement::roles([Role::Admin, Role::Manager, Role::Mechanic])
}

fn parse_garage_id(id: &str) -> Result<GarageId, axum::response::Response> {
    id.parse::<AggregateId>().map(GarageId::new).map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid garage id")
    })
}

/// GET /garages?status=&search=
pub async fn list_garages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(query): Query<dto::ListGaragesQuery>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &directory_readers()) {
        return denied;
    }

    let garages = services.garages.query(&GarageFilter {
        status: query.status,
        search: query.search,
    });

    (StatusCode::OK, Json(serde_json::json!({ "garages": garages }))).into_response()
}

/// GET /garages/:id
pub async fn get_garage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &directory_readers()) {
        return denied;
    }

    let garage_id = match parse_garage_id(&id) {
        Ok(garage_id) => garage_id,
        Err(resp) => return resp,
    };

    match services.garages.get(&garage_id) {
        Some(garage) => {
            (StatusCode::OK, Json(serde_json::json!({ "garage": garage }))).into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "garage not found"),
    }
}

/// POST /garages
pub async fn register_garage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::GarageDetailsRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &authz::roles_with(|c| c.can_add)) {
        return denied;
    }

    let aggregate_id = AggregateId::new();
    let garage_id = GarageId::new(aggregate_id);

    let cmd = GarageCommand::Register(RegisterGarage {
        garage_id,
        name: body.name,
        address: body.address,
        phone: body.phone,
        specialties: body.specialties,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Garage>(aggregate_id, "fleet.garage", cmd, |_| {
        Garage::empty(garage_id)
    }) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": garage_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /garages/:id/details
pub async fn update_details(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::GarageDetailsRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &authz::roles_with(|c| c.can_edit)) {
        return denied;
    }

    let garage_id = match parse_garage_id(&id) {
        Ok(garage_id) => garage_id,
        Err(resp) => return resp,
    };

    let cmd = GarageCommand::UpdateDetails(UpdateGarageDetails {
        garage_id,
        name: body.name,
        address: body.address,
        phone: body.phone,
        specialties: body.specialties,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Garage>(garage_id.0, "fleet.garage", cmd, |_| {
        Garage::empty(garage_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /garages/:id/status
pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeGarageStatusRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &authz::roles_with(|c| c.can_edit)) {
        return denied;
    }

    let garage_id = match parse_garage_id(&id) {
        Ok(garage_id) => garage_id,
        Err(resp) => return resp,
    };

    dispatch_status(services, garage_id, body.status)
}

/// DELETE /garages/:id - decommission (archive).
///
/// The stream is append-only, so removal is modeled as a terminal
/// deactivation; only admins hold the delete capability.
pub async fn decommission_garage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &authz::roles_with(|c| c.can_delete)) {
        return denied;
    }

    let garage_id = match parse_garage_id(&id) {
        Ok(garage_id) => garage_id,
        Err(resp) => return resp,
    };

    dispatch_status(services, garage_id, GarageStatus::Inactive)
}

fn dispatch_status(
    services: Arc<AppServices>,
    garage_id: GarageId,
    status: GarageStatus,
) -> axum::response::Response {
    let cmd = GarageCommand::ChangeStatus(ChangeGarageStatus {
        garage_id,
        status,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Garage>(garage_id.0, "fleet.garage", cmd, |_| {
        Garage::empty(garage_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
