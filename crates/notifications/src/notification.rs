use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetwise_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use fleetwise_events::Event;
use fleetwise_vehicles::VehicleId;

/// Notification identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub AggregateId);

impl NotificationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Maintenance,
    Alert,
    System,
}

/// Notification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

/// Aggregate root: Notification.
///
/// Notifications are write-once content; the only state that moves after
/// publication is the read flag, and marking an already-read notification is
/// a no-op rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    id: NotificationId,
    title: String,
    message: String,
    kind: NotificationKind,
    priority: NotificationPriority,
    user_id: Option<UserId>,
    vehicle_id: Option<VehicleId>,
    read: bool,
    version: u64,
    created: bool,
}

impl Notification {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: NotificationId) -> Self {
        Self {
            id,
            title: String::new(),
            message: String::new(),
            kind: NotificationKind::System,
            priority: NotificationPriority::Low,
            user_id: None,
            vehicle_id: None,
            read: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> NotificationId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn priority(&self) -> NotificationPriority {
        self.priority
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn vehicle_id(&self) -> Option<VehicleId> {
        self.vehicle_id
    }

    pub fn is_read(&self) -> bool {
        self.read
    }
}

impl AggregateRoot for Notification {
    type Id = NotificationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishNotification {
    pub notification_id: NotificationId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub user_id: Option<UserId>,
    pub vehicle_id: Option<VehicleId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkNotificationRead {
    pub notification_id: NotificationId,
    pub occurred_at: DateTime<Utc>,
}

/// All notification commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationCommand {
    Publish(PublishNotification),
    MarkRead(MarkNotificationRead),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPublished {
    pub notification_id: NotificationId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub user_id: Option<UserId>,
    pub vehicle_id: Option<VehicleId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMarkedRead {
    pub notification_id: NotificationId,
    pub occurred_at: DateTime<Utc>,
}

/// All notification events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationEvent {
    Published(NotificationPublished),
    MarkedRead(NotificationMarkedRead),
}

impl Event for NotificationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::Published(_) => "fleet.notification.published",
            NotificationEvent::MarkedRead(_) => "fleet.notification.marked_read",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            NotificationEvent::Published(e) => e.occurred_at,
            NotificationEvent::MarkedRead(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Notification {
    type Command = NotificationCommand;
    type Event = NotificationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            NotificationEvent::Published(e) => {
                self.id = e.notification_id;
                self.title = e.title.clone();
                self.message = e.message.clone();
                self.kind = e.kind;
                self.priority = e.priority;
                self.user_id = e.user_id;
                self.vehicle_id = e.vehicle_id;
                self.read = false;
                self.created = true;
            }
            NotificationEvent::MarkedRead(_) => {
                self.read = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            NotificationCommand::Publish(cmd) => self.handle_publish(cmd),
            NotificationCommand::MarkRead(cmd) => self.handle_mark_read(cmd),
        }
    }
}

impl Notification {
    fn handle_publish(
        &self,
        cmd: &PublishNotification,
    ) -> Result<Vec<NotificationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("notification already published"));
        }

        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("message cannot be empty"));
        }

        Ok(vec![NotificationEvent::Published(NotificationPublished {
            notification_id: cmd.notification_id,
            title: cmd.title.trim().to_string(),
            message: cmd.message.trim().to_string(),
            kind: cmd.kind,
            priority: cmd.priority,
            user_id: cmd.user_id,
            vehicle_id: cmd.vehicle_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_read(
        &self,
        cmd: &MarkNotificationRead,
    ) -> Result<Vec<NotificationEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }

        // Idempotent: already-read stays read, no event emitted.
        if self.read {
            return Ok(vec![]);
        }

        Ok(vec![NotificationEvent::MarkedRead(NotificationMarkedRead {
            notification_id: cmd.notification_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn published() -> (NotificationId, Notification) {
        let notification_id = NotificationId::new(AggregateId::new());
        let mut notification = Notification::empty(notification_id);
        let cmd = NotificationCommand::Publish(PublishNotification {
            notification_id,
            title: "Maintenance due".to_string(),
            message: "Vehicle AA-123-BB is due for its annual service.".to_string(),
            kind: NotificationKind::Maintenance,
            priority: NotificationPriority::Medium,
            user_id: None,
            vehicle_id: Some(VehicleId::new(AggregateId::new())),
            occurred_at: now(),
        });
        for event in notification.handle(&cmd).unwrap() {
            notification.apply(&event);
        }
        (notification_id, notification)
    }

    #[test]
    fn publish_requires_title_and_message() {
        let notification_id = NotificationId::new(AggregateId::new());
        let notification = Notification::empty(notification_id);

        let cmd = NotificationCommand::Publish(PublishNotification {
            notification_id,
            title: " ".to_string(),
            message: "body".to_string(),
            kind: NotificationKind::Alert,
            priority: NotificationPriority::High,
            user_id: None,
            vehicle_id: None,
            occurred_at: now(),
        });
        assert!(notification.handle(&cmd).is_err());
    }

    #[test]
    fn mark_read_is_idempotent() {
        let (notification_id, mut notification) = published();
        assert!(!notification.is_read());

        let cmd = NotificationCommand::MarkRead(MarkNotificationRead {
            notification_id,
            occurred_at: now(),
        });

        let events = notification.handle(&cmd).unwrap();
        assert_eq!(events.len(), 1);
        for event in events {
            notification.apply(&event);
        }
        assert!(notification.is_read());

        // Second mark-read emits nothing and is not an error.
        let events = notification.handle(&cmd).unwrap();
        assert!(events.is_empty());
    }
}
