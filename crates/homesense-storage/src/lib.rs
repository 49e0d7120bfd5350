//! Persistence layer for the HomeSense mining engine.
//!
//! - [`events`]: time-series event store (redb) with a range-scan query
//!   path and an in-memory variant for tests.
//! - [`repository`]: patterns, synergies, the append-only feedback log and
//!   engine state, committed atomically per mining run.
//! - [`cache`]: TTL + LRU read caches invalidated after each batch.
//! - [`feedback`]: validated intake for user feedback.

pub mod cache;
pub mod error;
pub mod events;
pub mod feedback;
pub mod repository;

pub use cache::QueryCache;
pub use error::{Error, Result};
pub use events::{EventStore, FailingEventStore, InMemoryEventStore, RedbEventStore};
pub use feedback::FeedbackSink;
pub use repository::{
    CALIBRATION_STATE_KEY, MiningRepository, PatternQuery, SynergyQuery,
};
