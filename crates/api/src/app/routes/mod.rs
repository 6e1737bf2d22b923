use axum::{Router, routing::get, routing::post};

pub mod auth;
pub mod garages;
pub mod maintenance;
pub mod notifications;
pub mod system;
pub mod users;
pub mod vehicles;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/sign-out", post(auth::sign_out))
        .nest("/users", users::router())
        .nest("/vehicles", vehicles::router())
        .nest("/maintenance", maintenance::router())
        .nest("/garages", garages::router())
        .nest("/notifications", notifications::router())
}
