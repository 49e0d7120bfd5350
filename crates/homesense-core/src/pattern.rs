//! Behavior patterns detected from historical events.
//!
//! A pattern is a recurring single- or multi-device behavior with a
//! confidence score and the evidence that supports it. Pattern identity is
//! stable across re-mining runs: the same `(kind, devices)` combination
//! always maps to the same `pattern_id`, so accumulated statistics and user
//! feedback survive each batch cycle.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// The closed set of detector kinds.
///
/// The detector pipeline iterates this enum; adding a detector means adding
/// a variant here and a matching meta payload, never runtime discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Device consistently enters a state around the same hour of day.
    TimeOfDay,
    /// Device B changes state shortly after device A.
    CoOccurrence,
    /// Ordered 3+ step device chain repeating within a bounded window.
    Sequence,
    /// Co-occurrence conditioned on an exogenous context attribute.
    Contextual,
    /// Co-occurrence restricted to devices sharing an area.
    RoomBased,
    /// Recurring device set within inactivity-gap user sessions.
    Session,
    /// Statistically consistent dwell time in a state.
    Duration,
    /// Time-of-day behavior split by weekday vs weekend.
    DayType,
    /// Behavior split by season bucket.
    Seasonal,
    /// Deviation from an established pattern's expected behavior.
    Anomaly,
}

impl PatternKind {
    /// Stable slug used in pattern ids and storage keys.
    pub fn slug(&self) -> &'static str {
        match self {
            PatternKind::TimeOfDay => "time_of_day",
            PatternKind::CoOccurrence => "co_occurrence",
            PatternKind::Sequence => "sequence",
            PatternKind::Contextual => "contextual",
            PatternKind::RoomBased => "room_based",
            PatternKind::Session => "session",
            PatternKind::Duration => "duration",
            PatternKind::DayType => "day_type",
            PatternKind::Seasonal => "seasonal",
            PatternKind::Anomaly => "anomaly",
        }
    }

    /// All detector kinds, in pipeline execution order.
    pub fn all() -> [PatternKind; 10] {
        [
            PatternKind::TimeOfDay,
            PatternKind::CoOccurrence,
            PatternKind::Sequence,
            PatternKind::Contextual,
            PatternKind::RoomBased,
            PatternKind::Session,
            PatternKind::Duration,
            PatternKind::DayType,
            PatternKind::Seasonal,
            PatternKind::Anomaly,
        ]
    }

    /// Anomaly patterns feed alerts, not automation suggestions.
    pub fn is_suggestible(&self) -> bool {
        !matches!(self, PatternKind::Anomaly)
    }
}

/// Weekday/weekend split used by the day-type detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClass {
    Weekday,
    Weekend,
}

impl DayClass {
    pub fn slug(&self) -> &'static str {
        match self {
            DayClass::Weekday => "weekday",
            DayClass::Weekend => "weekend",
        }
    }
}

/// Season bucket used by the seasonal detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Season for a calendar month (1-12), northern-hemisphere buckets.
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }
}

/// Detector-specific structured payload.
///
/// Each variant carries the fields its detector needs for downstream
/// scoring plus an `extra` escape hatch for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternMeta {
    TimeOfDay {
        /// Dominant hour of day (0-23).
        hour: u8,
        /// Target state the device enters around that hour.
        state: String,
        /// Fraction of occurrences inside the +/-1h band around the mode.
        band_fraction: f64,
        #[serde(default)]
        extra: serde_json::Value,
    },
    CoOccurrence {
        trigger: DeviceId,
        target: DeviceId,
        /// Detection window in seconds.
        window_secs: i64,
        /// Occurrences where the target followed the trigger in time.
        pair_count: u32,
        /// Total trigger occurrences.
        trigger_count: u32,
        /// Median lag between trigger and target, seconds.
        median_lag_secs: i64,
        #[serde(default)]
        extra: serde_json::Value,
    },
    Sequence {
        /// Device order of the chain.
        order: Vec<DeviceId>,
        window_secs: i64,
        /// How many times the full ordered chain repeated.
        repeats: u32,
        #[serde(default)]
        extra: serde_json::Value,
    },
    Contextual {
        trigger: DeviceId,
        target: DeviceId,
        /// Attribute key the match was conditioned on.
        context_key: String,
        /// Attribute value consistently present across matches.
        context_value: serde_json::Value,
        /// Fraction of matches carrying the context value.
        context_fraction: f64,
        #[serde(default)]
        extra: serde_json::Value,
    },
    RoomBased {
        area_id: String,
        trigger: DeviceId,
        target: DeviceId,
        pair_count: u32,
        #[serde(default)]
        extra: serde_json::Value,
    },
    Session {
        /// Inactivity gap that closed a session, seconds.
        gap_secs: i64,
        /// How many sessions contained the full device set.
        set_occurrences: u32,
        /// Total sessions observed.
        session_count: u32,
        #[serde(default)]
        extra: serde_json::Value,
    },
    Duration {
        /// State the device dwells in.
        state: String,
        mean_secs: f64,
        std_dev_secs: f64,
        samples: u32,
        #[serde(default)]
        extra: serde_json::Value,
    },
    DayType {
        day_class: DayClass,
        hour: u8,
        state: String,
        band_fraction: f64,
        #[serde(default)]
        extra: serde_json::Value,
    },
    Seasonal {
        season: Season,
        hour: u8,
        state: String,
        band_fraction: f64,
        #[serde(default)]
        extra: serde_json::Value,
    },
    Anomaly {
        /// Hour the established pattern expects activity at.
        expected_hour: u8,
        /// Observed deviant occurrence.
        observed_at: DateTime<Utc>,
        /// Deviation strength in hours from the expected band.
        deviation_hours: f64,
        #[serde(default)]
        extra: serde_json::Value,
    },
}

impl PatternMeta {
    /// The detector kind this payload belongs to.
    pub fn kind(&self) -> PatternKind {
        match self {
            PatternMeta::TimeOfDay { .. } => PatternKind::TimeOfDay,
            PatternMeta::CoOccurrence { .. } => PatternKind::CoOccurrence,
            PatternMeta::Sequence { .. } => PatternKind::Sequence,
            PatternMeta::Contextual { .. } => PatternKind::Contextual,
            PatternMeta::RoomBased { .. } => PatternKind::RoomBased,
            PatternMeta::Session { .. } => PatternKind::Session,
            PatternMeta::Duration { .. } => PatternKind::Duration,
            PatternMeta::DayType { .. } => PatternKind::DayType,
            PatternMeta::Seasonal { .. } => PatternKind::Seasonal,
            PatternMeta::Anomaly { .. } => PatternKind::Anomaly,
        }
    }
}

/// Evidence window statistics accumulated across mining runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindowStats {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Occurrence counts per hour of day.
    pub hour_histogram: [u32; 24],
}

impl TimeWindowStats {
    /// Build stats from occurrence timestamps. Returns `None` when empty.
    pub fn from_occurrences(occurrences: &[DateTime<Utc>]) -> Option<Self> {
        let first = *occurrences.iter().min()?;
        let last = *occurrences.iter().max()?;
        let mut histogram = [0u32; 24];
        for ts in occurrences {
            histogram[ts.hour() as usize] += 1;
        }
        Some(Self {
            first_seen: first,
            last_seen: last,
            hour_histogram: histogram,
        })
    }

    /// Extend this window with another one, widening the range and adding
    /// histograms.
    pub fn extend(&mut self, other: &TimeWindowStats) {
        self.first_seen = self.first_seen.min(other.first_seen);
        self.last_seen = self.last_seen.max(other.last_seen);
        for (slot, add) in self.hour_histogram.iter_mut().zip(other.hour_histogram) {
            *slot = slot.saturating_add(add);
        }
    }

    /// Total occurrences recorded in the histogram.
    pub fn total_occurrences(&self) -> u32 {
        self.hour_histogram.iter().sum()
    }

    /// Evidence span in days (at least a fraction of a day).
    pub fn span_days(&self) -> f64 {
        (self.last_seen - self.first_seen).num_seconds().max(0) as f64 / 86_400.0
    }
}

/// Canonicalize a device list: sorted, deduplicated.
///
/// Used for pattern identity so that `[a, b]` and `[b, a]` map to the same
/// persisted pattern. Order-sensitive detectors (sequence, co-occurrence)
/// keep the real order in their meta payload.
pub fn canonical_devices(devices: &[DeviceId]) -> Vec<DeviceId> {
    let mut out: Vec<DeviceId> = devices.to_vec();
    out.sort();
    out.dedup();
    out
}

/// A persisted behavior pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Stable identity derived from `(kind, devices)`.
    pub pattern_id: String,
    pub kind: PatternKind,
    /// Devices involved, canonical order.
    pub devices: Vec<DeviceId>,
    /// Final confidence in [0,1].
    pub confidence: f64,
    /// Number of observed occurrences, always >= 1.
    pub support_count: u32,
    pub window: TimeWindowStats,
    pub meta: PatternMeta,
    pub created_at: DateTime<Utc>,
    /// Last time a mining run re-confirmed this pattern. Staleness shows up
    /// as drift on this field, never as deletion.
    pub last_validated_at: DateTime<Utc>,
    /// Set when the pattern was boosted by an external reference corpus.
    #[serde(default)]
    pub community_enhanced: bool,
    /// Set when the recent occurrence rate left the drift tolerance band.
    /// Drifted patterns are kept but ranked down.
    #[serde(default)]
    pub drifted: bool,
}

impl Pattern {
    /// Derive the stable id for a `(kind, devices)` combination.
    pub fn stable_id(kind: PatternKind, devices: &[DeviceId]) -> String {
        let canonical = canonical_devices(devices);
        format!("{}:{}", kind.slug(), canonical.join("+"))
    }

    /// Create a pattern, clamping confidence into [0,1] and support to >= 1.
    pub fn new(
        kind: PatternKind,
        devices: Vec<DeviceId>,
        confidence: f64,
        support_count: u32,
        window: TimeWindowStats,
        meta: PatternMeta,
    ) -> Self {
        let devices = canonical_devices(&devices);
        let now = Utc::now();
        Self {
            pattern_id: Self::stable_id(kind, &devices),
            kind,
            devices,
            confidence: confidence.clamp(0.0, 1.0),
            support_count: support_count.max(1),
            window,
            meta,
            created_at: now,
            last_validated_at: now,
            community_enhanced: false,
            drifted: false,
        }
    }

    /// Update confidence, preserving the [0,1] invariant.
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = confidence.clamp(0.0, 1.0);
    }

    /// Historical occurrence rate: occurrences per day over the evidence
    /// span. Used as the drift-detection baseline.
    pub fn occurrence_rate(&self) -> f64 {
        let days = self.window.span_days().max(1.0 / 24.0);
        self.support_count as f64 / days
    }

    /// Whether this pattern involves the given device.
    pub fn involves(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d == device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stats_at(hours: &[u32]) -> TimeWindowStats {
        let occurrences: Vec<_> = hours
            .iter()
            .map(|h| Utc.with_ymd_and_hms(2026, 1, 10, *h, 0, 0).unwrap())
            .collect();
        TimeWindowStats::from_occurrences(&occurrences).unwrap()
    }

    #[test]
    fn test_stable_id_is_order_independent() {
        let a = Pattern::stable_id(
            PatternKind::CoOccurrence,
            &["light_hall".into(), "motion_hall".into()],
        );
        let b = Pattern::stable_id(
            PatternKind::CoOccurrence,
            &["motion_hall".into(), "light_hall".into()],
        );
        assert_eq!(a, b);
        assert_eq!(a, "co_occurrence:light_hall+motion_hall");
    }

    #[test]
    fn test_confidence_clamped_and_support_floored() {
        let pattern = Pattern::new(
            PatternKind::TimeOfDay,
            vec!["light_hall".into()],
            1.7,
            0,
            stats_at(&[7, 7, 8]),
            PatternMeta::TimeOfDay {
                hour: 7,
                state: "on".into(),
                band_fraction: 1.0,
                extra: serde_json::Value::Null,
            },
        );
        assert_eq!(pattern.confidence, 1.0);
        assert_eq!(pattern.support_count, 1);
    }

    #[test]
    fn test_window_extend_widens_and_sums() {
        let mut a = stats_at(&[7, 7]);
        let b = stats_at(&[8, 9]);
        a.extend(&b);
        assert_eq!(a.total_occurrences(), 4);
        assert_eq!(a.hour_histogram[7], 2);
        assert_eq!(a.hour_histogram[9], 1);
    }

    #[test]
    fn test_season_from_month() {
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(4), Season::Spring);
        assert_eq!(Season::from_month(7), Season::Summer);
        assert_eq!(Season::from_month(10), Season::Autumn);
        assert_eq!(Season::from_month(12), Season::Winter);
    }

    #[test]
    fn test_meta_roundtrip_keeps_kind_tag() {
        let meta = PatternMeta::Sequence {
            order: vec!["a".into(), "b".into(), "c".into()],
            window_secs: 600,
            repeats: 5,
            extra: serde_json::Value::Null,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["kind"], "sequence");
        let back: PatternMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), PatternKind::Sequence);
    }
}
