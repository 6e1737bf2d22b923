//! Maintenance schedule routes.

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
use fleetwise_garages::GarageId;
use fleetwise_infra::projections::{VehicleFilter, WorkOrderFilter};
use fleetwise_maintenance::{
    CancelWorkOrder, CompleteWorkOrder, ScheduleMaintenance, StartWorkOrder, WorkOrder,
    WorkOrderCommand, WorkOrderId,
};
use fleetwise_vehicles::VehicleId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_work_orders).post(schedule_maintenance))
        .route("/:id", get(get_work_order))
        .route("/:id/start", post(start_work_order))
        .route("/:id/complete", post(complete_work_order))
        .route("/:id/cancel", post(cancel_work_order))
}

fn maintainers() -> Requirement {
    authz::roles_with(|c| c.can_maintain)
}

fn parse_work_order_id(id: &str) -> Result<WorkOrderId, axum::response::Response> {
    id.parse::<AggregateId>().map(WorkOrderId::new).map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid work order id")
    })
}

/// GET /maintenance?status=&vehicle_id=&search=
///
/// Drivers only see work orders for vehicles they are assigned to.
pub async fn list_work_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(query): Query<dto::ListWorkOrdersQuery>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &Requirement::any_authenticated()) {
        return denied;
    }

    let vehicle_id = match query.vehicle_id.as_deref() {
        Some(id) => match id.parse::<AggregateId>() {
            Ok(aggregate_id) => Some(VehicleId::new(aggregate_id)),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid vehicle id",
                );
            }
        },
        None => None,
    };

    let mut orders = services.work_orders.query(&WorkOrderFilter {
        status: query.status,
        vehicle_id,
        search: query.search,
    });

    let actor = ctx.actor();
    if actor.role == Role::Driver {
        let own: Vec<VehicleId> = services
            .vehicles
            .query(&VehicleFilter {
                driver_id: Some(actor.id),
                ..Default::default()
            })
            .into_iter()
            .map(|v| v.vehicle_id)
            .collect();
        orders.retain(|o| own.contains(&o.vehicle_id));
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "work_orders": orders })),
    )
        .into_response()
}

/// GET /maintenance/:id
pub async fn get_work_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &Requirement::any_authenticated()) {
        return denied;
    }

    let work_order_id = match parse_work_order_id(&id) {
        Ok(work_order_id) => work_order_id,
        Err(resp) => return resp,
    };

    match services.work_orders.get(&work_order_id) {
        Some(order) => (
            StatusCode::OK,
            Json(serde_json::json!({ "work_order": order })),
        )
            .into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "work order not found"),
    }
}

/// POST /maintenance
///
/// Admins, managers and mechanics may schedule for any vehicle; a driver
/// only for the vehicle they are assigned to (row-level rule, enforced here
/// against the fleet read model, not by the role gate).
pub async fn schedule_maintenance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::ScheduleMaintenanceRequest>,
) -> axum::response::Response {
    let vehicle_id = match body.vehicle_id.parse::<AggregateId>() {
        Ok(aggregate_id) => VehicleId::new(aggregate_id),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid vehicle id");
        }
    };

    let Some(vehicle) = services.vehicles.get(&vehicle_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "vehicle not found");
    };

    let actor = ctx.actor();
    let role_allows = actor.role.capabilities().can_maintain;
    let own_vehicle = actor.role == Role::Driver && vehicle.driver_id == Some(actor.id);
    if !role_allows && !own_vehicle {
        return authz::forbidden(maintainers().accepted_roles());
    }

    let garage_id = match body.garage_id.as_deref() {
        Some(id) => match id.parse::<AggregateId>() {
            Ok(aggregate_id) => Some(GarageId::new(aggregate_id)),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid garage id",
                );
            }
        },
        None => None,
    };

    let aggregate_id = AggregateId::new();
    let work_order_id = WorkOrderId::new(aggregate_id);

    let cmd = WorkOrderCommand::Schedule(ScheduleMaintenance {
        work_order_id,
        vehicle_id,
        garage_id,
        kind: body.kind,
        description: body.description,
        scheduled_date: body.scheduled_date,
        estimated_cost: body.estimated_cost,
        created_by: actor.id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<WorkOrder>(aggregate_id, "fleet.maintenance", cmd, |_| {
        WorkOrder::empty(work_order_id)
    }) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": work_order_id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /maintenance/:id/start
pub async fn start_work_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &maintainers()) {
        return denied;
    }

    let work_order_id = match parse_work_order_id(&id) {
        Ok(work_order_id) => work_order_id,
        Err(resp) => return resp,
    };

    let cmd = WorkOrderCommand::Start(StartWorkOrder {
        work_order_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<WorkOrder>(work_order_id.0, "fleet.maintenance", cmd, |_| {
        WorkOrder::empty(work_order_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /maintenance/:id/complete
pub async fn complete_work_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CompleteWorkOrderRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &maintainers()) {
        return denied;
    }

    let work_order_id = match parse_work_order_id(&id) {
        Ok(work_order_id) => work_order_id,
        Err(resp) => return resp,
    };

    let now = Utc::now();
    let cmd = WorkOrderCommand::Complete(CompleteWorkOrder {
        work_order_id,
        actual_cost: body.actual_cost,
        completed_date: body.completed_date.unwrap_or(now),
        occurred_at: now,
    });

    match services.dispatch::<WorkOrder>(work_order_id.0, "fleet.maintenance", cmd, |_| {
        WorkOrder::empty(work_order_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /maintenance/:id/cancel
pub async fn cancel_work_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelWorkOrderRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &maintainers()) {
        return denied;
    }

    let work_order_id = match parse_work_order_id(&id) {
        Ok(work_order_id) => work_order_id,
        Err(resp) => return resp,
    };

    let cmd = WorkOrderCommand::Cancel(CancelWorkOrder {
        work_order_id,
        reason: body.reason,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<WorkOrder>(work_order_id.0, "fleet.maintenance", cmd, |_| {
        WorkOrder::empty(work_order_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
