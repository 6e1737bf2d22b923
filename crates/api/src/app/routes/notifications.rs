//! Inbox routes, including the realtime SSE stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::Utc;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use fleetwise_auth::Requirement;
use fleetwise_core::AggregateId;
use fleetwise_infra::projections::NotificationFilter;
use fleetwise_notifications::{
    MarkNotificationRead, Notification, NotificationCommand, NotificationId,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/stream", get(stream_notifications))
        .route("/:id/read", post(mark_read))
}

/// GET /notifications?kind=&unread_only=&search=
pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Query(query): Query<dto::ListNotificationsQuery>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &Requirement::any_authenticated()) {
        return denied;
    }

    let notifications = services.notifications.query(&NotificationFilter {
        kind: query.kind,
        unread_only: query.unread_only,
        search: query.search,
    });

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "unread": services.notifications.unread_count(),
            "notifications": notifications,
        })),
    )
        .into_response()
}

/// POST /notifications/:id/read. Idempotent.
pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &Requirement::any_authenticated()) {
        return denied;
    }

    let notification_id = match id.parse::<AggregateId>() {
        Ok(aggregate_id) => NotificationId::new(aggregate_id),
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                "invalid notification id",
            );
        }
    };

    let cmd = NotificationCommand::MarkRead(MarkNotificationRead {
        notification_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Notification>(notification_id.0, "fleet.notification", cmd, |_| {
        Notification::empty(notification_id)
    }) {
        Ok(_) => (StatusCode::NO_CONTENT, ()).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// GET /notifications/stream - realtime updates via Server-Sent Events.
pub async fn stream_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(ctx.actor(), &Requirement::any_authenticated()) {
        return denied;
    }

    let rx = services.subscribe_realtime();

    // Lossy by design: a slow consumer drops messages rather than exerting
    // backpressure on the event pipeline.
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let msg = msg.ok()?;
        let event = SseEvent::default()
            .event(msg.topic.clone())
            .json_data(&msg)
            .ok()?;
        Some(Ok::<SseEvent, Infallible>(event))
    });

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
        .into_response()
}
