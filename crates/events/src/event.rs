use chrono::{DateTime, Utc};

/// A domain-agnostic event: an immutable fact that already happened.
///
/// Events are appended, never edited; `version` exists so a payload's schema
/// can evolve without breaking stored history.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "fleet.vehicle.registered").
    fn event_type(&self) -> &'static str;

    /// Schema version of this event type's payload.
    fn version(&self) -> u32;

    /// Business time: when the fact occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
