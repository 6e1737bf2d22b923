//! `fleetwise-events` — domain event distribution (mechanics only).
//!
//! Events are persisted by the event store first; this crate only carries the
//! pub/sub transport used to feed projections and realtime consumers.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
