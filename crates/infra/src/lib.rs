//! `fleetwise-infra` — infrastructure composition.
//!
//! In-memory event store, command dispatcher, read-model stores, projections,
//! and the directory-backed identity store. Domain crates stay pure; this is
//! where their pieces are wired to storage and distribution.

pub mod command_dispatcher;
pub mod event_store;
pub mod identity;
pub mod projections;
pub mod read_model;

#[cfg(test)]
mod integration_tests;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use identity::DirectoryIdentityStore;
pub use read_model::{InMemoryReadStore, ReadStore};
