//! User administration routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use fleetwise_auth::{
    ActivateUser, ChangeRole, CreateUser, DeactivateUser, Requirement, Role, User, UserCommand,
};
use fleetwise_core::{AggregateId, UserId};
use fleetwise_infra::projections::UserFilter;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user))
        .route("/:id/role", post(change_role))
        .route("/:id/activate", post(activate_user))
        .route("/:id/deactivate", post(deactivate_user))
}

fn directory_readers() -> Requirement {
    Requirement::roles([Role::Admin, Role::Manager])
}

fn administrators() -> Requirement {
    Requirement::roles([Role::Admin])
}

fn parse_user_id(id: &str) -> Result<UserId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id")
    })
}

/// GET /users?role=&status=&search=
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(query): Query<dto::ListUsersQuery>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &directory_readers()) {
        return denied;
    }

    let role = match query.role.as_deref().map(dto::parse_role).transpose() {
        Ok(role) => role,
        Err(resp) => return resp,
    };
    let status = match query.status.as_deref().map(dto::parse_user_status).transpose() {
        Ok(status) => status,
        Err(resp) => return resp,
    };

    let users = services.users.query(&UserFilter {
        role,
        status,
        search: query.search,
    });

    (StatusCode::OK, Json(serde_json::json!({ "users": users }))).into_response()
}

/// GET /users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &directory_readers()) {
        return denied;
    }

    let user_id = match parse_user_id(&id) {
        Ok(user_id) => user_id,
        Err(resp) => return resp,
    };

    match services.users.get(&user_id) {
        Some(user) => (StatusCode::OK, Json(serde_json::json!({ "user": user }))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
    }
}

/// POST /users
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &administrators()) {
        return denied;
    }

    let role = match dto::parse_role(&body.role) {
        Ok(role) => role,
        Err(resp) => return resp,
    };

    let user_id = UserId::new();
    let cmd = UserCommand::Create(CreateUser {
        user_id,
        email: body.email.clone(),
        display_name: body.display_name,
        role,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<User>(
        AggregateId::from_uuid(*user_id.as_uuid()),
        "auth.user",
        cmd,
        |_| User::empty(user_id),
    ) {
        Ok(_) => {
            services.set_password(&body.email.to_lowercase(), &body.password);
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "id": user_id.to_string() })),
            )
                .into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /users/:id/role
pub async fn change_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeRoleRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &administrators()) {
        return denied;
    }

    let user_id = match parse_user_id(&id) {
        Ok(user_id) => user_id,
        Err(resp) => return resp,
    };

    let role = match dto::parse_role(&body.role) {
        Ok(role) => role,
        Err(resp) => return resp,
    };

    let cmd = UserCommand::ChangeRole(ChangeRole {
        user_id,
        role,
        actor_role: ctx.actor().role,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<User>(
        AggregateId::from_uuid(*user_id.as_uuid()),
        "auth.user",
        cmd,
        |_| User::empty(user_id),
    ) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /users/:id/activate
pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    toggle_status(services, ctx, &id, true).await
}

/// POST /users/:id/deactivate
pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    toggle_status(services, ctx, &id, false).await
}

async fn toggle_status(
    services: Arc<AppServices>,
    ctx: ActorContext,
    id: &str,
    activate: bool,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &administrators()) {
        return denied;
    }

    let user_id = match parse_user_id(id) {
        Ok(user_id) => user_id,
        Err(resp) => return resp,
    };

    let cmd = if activate {
        UserCommand::Activate(ActivateUser {
            user_id,
            occurred_at: Utc::now(),
        })
    } else {
        UserCommand::Deactivate(DeactivateUser {
            user_id,
            occurred_at: Utc::now(),
        })
    };

    match services.dispatch::<User>(
        AggregateId::from_uuid(*user_id.as_uuid()),
        "auth.user",
        cmd,
        |_| User::empty(user_id),
    ) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
