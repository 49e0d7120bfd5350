//! Shared windowing utilities over the historical event feed.
//!
//! Every detector consumes the same [`EventWindow`]: events sorted by
//! timestamp with helpers for per-device partitioning, state-entry
//! extraction, session segmentation and hour clustering.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use homesense_core::{DayClass, Event, Season};

/// States that carry no behavioral signal.
fn is_noise_state(state: &str) -> bool {
    state.is_empty() || state == "unavailable" || state == "unknown"
}

/// A bounded, time-sorted window of events.
#[derive(Debug, Clone)]
pub struct EventWindow {
    events: Vec<Event>,
}

impl EventWindow {
    /// Build a window, sorting events by timestamp.
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.timestamp);
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Evidence span of the window in days.
    pub fn span_days(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => {
                (last.timestamp - first.timestamp).num_seconds().max(0) as f64 / 86_400.0
            }
            _ => 0.0,
        }
    }

    /// Actual state transitions, skipping noise states and no-op updates.
    pub fn transitions(&self) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(|e| e.is_transition() && !is_noise_state(&e.state))
    }

    /// Timestamps of each device entering each state.
    pub fn state_entries(&self) -> HashMap<(String, String), Vec<DateTime<Utc>>> {
        let mut map: HashMap<(String, String), Vec<DateTime<Utc>>> = HashMap::new();
        for event in self.transitions() {
            map.entry((event.device_id.clone(), event.state.clone()))
                .or_default()
                .push(event.timestamp);
        }
        map
    }

    /// Transitions grouped by device, preserving time order.
    pub fn transitions_by_device(&self) -> HashMap<String, Vec<&Event>> {
        let mut map: HashMap<String, Vec<&Event>> = HashMap::new();
        for event in self.transitions() {
            map.entry(event.device_id.clone()).or_default().push(event);
        }
        map
    }

    /// Segment the window into user sessions separated by inactivity gaps.
    pub fn sessions(&self, gap_secs: i64) -> Vec<&[Event]> {
        let mut sessions = Vec::new();
        if self.events.is_empty() {
            return sessions;
        }
        let mut start = 0;
        for i in 1..self.events.len() {
            let gap = (self.events[i].timestamp - self.events[i - 1].timestamp).num_seconds();
            if gap > gap_secs {
                sessions.push(&self.events[start..i]);
                start = i;
            }
        }
        sessions.push(&self.events[start..]);
        sessions
    }

    /// Restrict the window to events matching a predicate.
    pub fn filtered(&self, predicate: impl Fn(&Event) -> bool) -> EventWindow {
        EventWindow {
            events: self.events.iter().filter(|e| predicate(e)).cloned().collect(),
        }
    }
}

/// Day class for a timestamp.
pub fn day_class(ts: DateTime<Utc>) -> DayClass {
    match ts.weekday() {
        Weekday::Sat | Weekday::Sun => DayClass::Weekend,
        _ => DayClass::Weekday,
    }
}

/// Season bucket for a timestamp.
pub fn season_of(ts: DateTime<Utc>) -> Season {
    Season::from_month(ts.month())
}

/// Circular distance between two hours of day, in hours (0-12).
pub fn hour_distance(a: u32, b: u32) -> u32 {
    let diff = a.abs_diff(b);
    diff.min(24 - diff)
}

/// Dominant hour-of-day cluster over a set of occurrence timestamps.
#[derive(Debug, Clone)]
pub struct HourCluster {
    /// Mode hour (0-23).
    pub mode_hour: u8,
    /// Fraction of occurrences inside the +/-1h band around the mode,
    /// wrapping at midnight.
    pub band_fraction: f64,
    /// Total occurrences.
    pub count: u32,
}

impl HourCluster {
    /// Cluster occurrences by hour of day. Returns `None` when empty.
    pub fn from_occurrences(occurrences: &[DateTime<Utc>]) -> Option<Self> {
        if occurrences.is_empty() {
            return None;
        }
        let mut histogram = [0u32; 24];
        for ts in occurrences {
            histogram[ts.hour() as usize] += 1;
        }
        let mode_hour = (0..24).max_by_key(|&h| histogram[h]).unwrap_or(0);
        let in_band: u32 = (0..24)
            .filter(|&h| hour_distance(h as u32, mode_hour as u32) <= 1)
            .map(|h| histogram[h])
            .sum();
        let count = occurrences.len() as u32;
        Some(Self {
            mode_hour: mode_hour as u8,
            band_fraction: in_band as f64 / count as f64,
            count,
        })
    }

    /// Consistency weighted by sample count: the band fraction discounted
    /// for thin evidence so three tight occurrences never outrank thirty.
    pub fn weighted_confidence(&self) -> f64 {
        let n = self.count as f64;
        (self.band_fraction * (n / (n + 3.0))).clamp(0.0, 1.0)
    }
}
