//! Detector output: pattern candidates with their supporting evidence.

use chrono::{DateTime, Utc};
use homesense_core::{DeviceId, Pattern, PatternKind, PatternMeta, TimeWindowStats};
use serde::{Deserialize, Serialize};

/// A candidate emitted by one detector during a mining run.
///
/// Carries the detector's raw confidence plus the occurrence timestamps the
/// merger and the scoring framework need downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCandidate {
    pub kind: PatternKind,
    /// Devices involved; canonicalized when the candidate becomes a pattern.
    pub devices: Vec<DeviceId>,
    /// Raw detector confidence in [0,1].
    pub confidence: f64,
    /// Evidence: timestamps of the observed occurrences, sorted.
    pub occurrences: Vec<DateTime<Utc>>,
    pub meta: PatternMeta,
}

impl PatternCandidate {
    pub fn new(
        kind: PatternKind,
        devices: Vec<DeviceId>,
        confidence: f64,
        mut occurrences: Vec<DateTime<Utc>>,
        meta: PatternMeta,
    ) -> Self {
        occurrences.sort();
        Self {
            kind,
            devices,
            confidence: confidence.clamp(0.0, 1.0),
            occurrences,
            meta,
        }
    }

    /// Number of observed occurrences backing this candidate.
    pub fn support(&self) -> u32 {
        self.occurrences.len() as u32
    }

    /// Stable pattern id this candidate would merge into.
    pub fn pattern_id(&self) -> String {
        Pattern::stable_id(self.kind, &self.devices)
    }

    /// Promote a candidate with no existing match into a new pattern.
    pub fn into_pattern(self) -> Option<Pattern> {
        let window = TimeWindowStats::from_occurrences(&self.occurrences)?;
        Some(Pattern::new(
            self.kind,
            self.devices,
            self.confidence,
            self.occurrences.len() as u32,
            window,
            self.meta,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_into_pattern_carries_evidence() {
        let occurrences: Vec<_> = (0..5)
            .map(|d| Utc.with_ymd_and_hms(2026, 1, 10 + d, 7, 30, 0).unwrap())
            .collect();
        let candidate = PatternCandidate::new(
            PatternKind::TimeOfDay,
            vec!["light_hall".into()],
            0.8,
            occurrences,
            PatternMeta::TimeOfDay {
                hour: 7,
                state: "on".into(),
                band_fraction: 1.0,
                extra: serde_json::Value::Null,
            },
        );
        let pattern = candidate.into_pattern().unwrap();
        assert_eq!(pattern.support_count, 5);
        assert_eq!(pattern.window.hour_histogram[7], 5);
    }

    #[test]
    fn test_empty_candidate_yields_no_pattern() {
        let candidate = PatternCandidate::new(
            PatternKind::TimeOfDay,
            vec!["light_hall".into()],
            0.8,
            vec![],
            PatternMeta::TimeOfDay {
                hour: 7,
                state: "on".into(),
                band_fraction: 1.0,
                extra: serde_json::Value::Null,
            },
        );
        assert!(candidate.into_pattern().is_none());
    }
}
