//! `backoffice-events` — domain event plumbing.
//!
//! The [`Event`] trait and [`EventEnvelope`] are the contract between domain
//! crates and whatever persists or distributes their events. [`store`] holds
//! the append-only, tenant-scoped [`store::EventStore`] abstraction plus an
//! in-memory implementation used by tests and dev tooling.

pub mod envelope;
pub mod event;
pub mod store;

pub use envelope::EventEnvelope;
pub use event::Event;
pub use store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
