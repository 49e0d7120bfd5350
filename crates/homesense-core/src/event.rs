//! Normalized device state-change events.
//!
//! Events are read-only input to the engine. They are produced by the
//! protocol clients that watch the home-automation hub and are stored in the
//! time-series event store; the engine only ever queries a bounded
//! historical window of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single normalized state-change record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Full entity identifier, e.g. `light.hall`.
    pub entity_id: String,
    /// Stable device identifier (one device may expose several entities).
    pub device_id: String,
    /// Domain of the entity, e.g. `light`, `binary_sensor`, `climate`.
    pub domain: String,
    /// Area/room the device is assigned to, if known.
    pub area_id: Option<String>,
    /// New state after the change.
    pub state: String,
    /// State before the change, if the hub reported one.
    pub previous_state: Option<String>,
    /// Opaque attribute map carried with the state change.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a minimal event for the given device/state transition.
    pub fn new(
        entity_id: impl Into<String>,
        device_id: impl Into<String>,
        state: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let entity_id = entity_id.into();
        let domain = entity_id
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            entity_id,
            device_id: device_id.into(),
            domain,
            area_id: None,
            state: state.into(),
            previous_state: None,
            attributes: serde_json::Map::new(),
            timestamp,
        }
    }

    /// Set the area the device belongs to.
    pub fn with_area(mut self, area_id: impl Into<String>) -> Self {
        self.area_id = Some(area_id.into());
        self
    }

    /// Set the previous state.
    pub fn with_previous_state(mut self, previous: impl Into<String>) -> Self {
        self.previous_state = Some(previous.into());
        self
    }

    /// Attach an attribute value.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Whether this event represents an actual state transition.
    pub fn is_transition(&self) -> bool {
        match &self.previous_state {
            Some(prev) => prev != &self.state,
            None => true,
        }
    }
}

/// Inclusive-exclusive time range `[start, end)` for event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Rolling window ending now and spanning the given number of days.
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Span of the range in whole seconds.
    pub fn span_secs(&self) -> i64 {
        (self.end - self.start).num_seconds().max(0)
    }
}

/// Optional filters for an event query.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Restrict to a single device.
    pub device_id: Option<String>,
    /// Restrict to a domain (e.g. `light`).
    pub domain: Option<String>,
}

impl EventFilter {
    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            domain: None,
        }
    }

    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            device_id: None,
            domain: Some(domain.into()),
        }
    }

    /// Whether an event passes this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(d) = &self.device_id {
            if &event.device_id != d {
                return false;
            }
        }
        if let Some(d) = &self.domain {
            if &event.domain != d {
                return false;
            }
        }
        true
    }
}
