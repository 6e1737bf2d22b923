//! Sign-in/sign-out and the current-actor endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use fleetwise_auth::project_menu;
use fleetwise_session::{Credential, SignInError};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

/// POST /auth/sign-in (ungated).
///
/// A failed attempt returns 401 and leaves any existing session untouched.
pub async fn sign_in(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SignInRequest>,
) -> axum::response::Response {
    let credential = Credential {
        email: body.email,
        password: body.password,
    };

    match services.sign_in(&credential) {
        Ok((token, actor)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "token": token.to_string(),
                "capabilities": actor.role.capabilities(),
                "menu": project_menu(actor.role),
                "actor": actor,
            })),
        )
            .into_response(),
        Err(SignInError::AccountInactive) => errors::json_error(
            StatusCode::UNAUTHORIZED,
            "account_inactive",
            "this account has been deactivated",
        ),
        Err(SignInError::InvalidCredential) => errors::json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid email or password",
        ),
    }
}

/// GET /auth/me - current actor, projected capabilities, projected menu.
pub async fn me(Extension(ctx): Extension<ActorContext>) -> axum::response::Response {
    let actor = ctx.actor();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "actor": actor,
            "capabilities": actor.role.capabilities(),
            "menu": project_menu(actor.role),
        })),
    )
        .into_response()
}

/// POST /auth/sign-out. Idempotent.
pub async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Some(token) = bearer_token(&headers) {
        services.sign_out(&token);
    }
    (StatusCode::NO_CONTENT, ()).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<uuid::Uuid> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim()
        .parse()
        .ok()
}
