//! Notifications domain module (event-sourced).

pub mod notification;

pub use notification::{
    MarkNotificationRead, Notification, NotificationCommand, NotificationEvent, NotificationId,
    NotificationKind, NotificationMarkedRead, NotificationPriority, NotificationPublished,
    PublishNotification,
};
