//! Notifications projection: the inbox read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_core::UserId;
use fleetwise_events::EventEnvelope;
use fleetwise_notifications::{
    NotificationEvent, NotificationId, NotificationKind, NotificationPriority,
};
use fleetwise_vehicles::VehicleId;

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationReadModel {
    pub notification_id: NotificationId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub user_id: Option<UserId>,
    pub vehicle_id: Option<VehicleId>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Query filter for the inbox.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub kind: Option<NotificationKind>,
    pub unread_only: bool,
    pub search: Option<String>,
}

/// Projection maintaining the inbox.
pub struct NotificationsProjection<S> {
    store: S,
}

impl<S> NotificationsProjection<S>
where
    S: ReadStore<NotificationId, NotificationReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if !envelope.aggregate_type().starts_with("fleet.notification") {
            return Ok(());
        }

        let event: NotificationEvent = serde_json::from_value(envelope.payload().clone())?;

        match event {
            NotificationEvent::Published(e) => {
                self.store.upsert(
                    e.notification_id,
                    NotificationReadModel {
                        notification_id: e.notification_id,
                        title: e.title,
                        message: e.message,
                        kind: e.kind,
                        priority: e.priority,
                        user_id: e.user_id,
                        vehicle_id: e.vehicle_id,
                        read: false,
                        created_at: e.occurred_at,
                    },
                );
            }
            NotificationEvent::MarkedRead(e) => {
                if let Some(mut model) = self.store.get(&e.notification_id) {
                    model.read = true;
                    self.store.upsert(e.notification_id, model);
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, notification_id: &NotificationId) -> Option<NotificationReadModel> {
        self.store.get(notification_id)
    }

    pub fn unread_count(&self) -> usize {
        self.store.list().iter().filter(|n| !n.read).count()
    }

    /// List the inbox, newest first, applying the filter.
    pub fn query(&self, filter: &NotificationFilter) -> Vec<NotificationReadModel> {
        let mut notifications: Vec<NotificationReadModel> = self
            .store
            .list()
            .into_iter()
            .filter(|n| {
                if let Some(kind) = filter.kind {
                    if n.kind != kind {
                        return false;
                    }
                }
                if filter.unread_only && n.read {
                    return false;
                }
                if let Some(search) = &filter.search {
                    if !super::matches_search(&[&n.title, &n.message], search) {
                        return false;
                    }
                }
                true
            })
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }
}
