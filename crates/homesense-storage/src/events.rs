//! Time-series event store.
//!
//! Events are keyed by `(timestamp_micros, seq)` so range queries over a
//! time window are a single contiguous scan. The sequence counter breaks
//! ties between events landing in the same microsecond; it is persisted
//! alongside the events so a restart never reissues a key.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info};

use homesense_core::{Event, EventFilter, TimeRange};

use crate::{Error, Result};

// Events table: key = (timestamp_micros, seq), value = Event as JSON
const EVENTS_TABLE: TableDefinition<(i64, u64), &str> = TableDefinition::new("events");

// Store metadata. Holds the next sequence value; the last key in
// timestamp order does not necessarily carry the highest seq.
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_SEQ_KEY: &str = "next_seq";

/// Read access to the historical event window.
pub trait EventStore: Send + Sync {
    /// Append one event.
    fn append(&self, event: &Event) -> Result<()>;

    /// Append a batch of events in one transaction.
    fn append_batch(&self, events: &[Event]) -> Result<()>;

    /// Events within `[range.start, range.end)` passing the filter, in
    /// timestamp order.
    fn query(&self, range: &TimeRange, filter: &EventFilter) -> Result<Vec<Event>>;

    /// Drop events older than the cutoff, returning how many were removed.
    fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// redb-backed event store.
pub struct RedbEventStore {
    db: Arc<Database>,
    seq: AtomicU64,
}

impl RedbEventStore {
    /// Open (or create) the event store under the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = Database::create(path.join("events.redb"))?;

        let write_txn = db.begin_write()?;
        let next_seq = {
            let events = write_txn.open_table(EVENTS_TABLE)?;
            let meta = write_txn.open_table(META_TABLE)?;
            let stored = meta.get(NEXT_SEQ_KEY)?.map(|v| v.value());
            match stored {
                Some(next) => next,
                // No counter yet: rebuild it from every stored key.
                None => {
                    let mut next = 0u64;
                    for entry in events.iter()? {
                        let (key, _) = entry?;
                        next = next.max(key.value().1 + 1);
                    }
                    next
                }
            }
        };
        write_txn.commit()?;

        info!(path = %path.display(), next_seq, "event store opened");
        Ok(Self {
            db: Arc::new(db),
            seq: AtomicU64::new(next_seq),
        })
    }
}

impl EventStore for RedbEventStore {
    fn append(&self, event: &Event) -> Result<()> {
        self.append_batch(std::slice::from_ref(event))
    }

    fn append_batch(&self, events: &[Event]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(EVENTS_TABLE)?;
            for event in events {
                let key = (
                    event.timestamp.timestamp_micros(),
                    self.seq.fetch_add(1, Ordering::Relaxed),
                );
                let json = serde_json::to_string(event)?;
                table.insert(key, json.as_str())?;
            }
        }
        {
            let mut meta = write_txn.open_table(META_TABLE)?;
            meta.insert(NEXT_SEQ_KEY, self.seq.load(Ordering::Relaxed))?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn query(&self, range: &TimeRange, filter: &EventFilter) -> Result<Vec<Event>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let start = (range.start.timestamp_micros(), u64::MIN);
        let end = (range.end.timestamp_micros(), u64::MIN);

        let mut events = Vec::new();
        for entry in table.range(start..end)? {
            let (_, value) = entry?;
            let event: Event = serde_json::from_str(value.value())?;
            if filter.matches(&event) {
                events.push(event);
            }
        }
        debug!(count = events.len(), "event query complete");
        Ok(events)
    }

    fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(EVENTS_TABLE)?;
            let stale: Vec<(i64, u64)> = table
                .range(..(cutoff.timestamp_micros(), u64::MIN))?
                .map(|entry| entry.map(|(key, _)| key.value()))
                .collect::<std::result::Result<_, _>>()?;
            for key in &stale {
                table.remove(*key)?;
            }
            stale.len() as u64
        };
        write_txn.commit()?;
        if removed > 0 {
            info!(removed, "pruned stale events");
        }
        Ok(removed)
    }
}

/// In-memory event store, for tests and embedded use.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a batch of events.
    pub fn with_events(events: Vec<Event>) -> Self {
        let store = Self::new();
        *store.events.write() = events;
        store
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: &Event) -> Result<()> {
        self.events.write().push(event.clone());
        Ok(())
    }

    fn append_batch(&self, events: &[Event]) -> Result<()> {
        self.events.write().extend_from_slice(events);
        Ok(())
    }

    fn query(&self, range: &TimeRange, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .iter()
            .filter(|e| range.contains(e.timestamp) && filter.matches(e))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut events = self.events.write();
        let before = events.len();
        events.retain(|e| e.timestamp >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

/// Failing store used to exercise error paths in the pipeline.
pub struct FailingEventStore;

impl EventStore for FailingEventStore {
    fn append(&self, _event: &Event) -> Result<()> {
        Err(Error::Storage("event store unavailable".into()))
    }

    fn append_batch(&self, _events: &[Event]) -> Result<()> {
        Err(Error::Storage("event store unavailable".into()))
    }

    fn query(&self, _range: &TimeRange, _filter: &EventFilter) -> Result<Vec<Event>> {
        Err(Error::Storage("event store unavailable".into()))
    }

    fn prune_before(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
        Err(Error::Storage("event store unavailable".into()))
    }
}
