//! Behavior drift detection.
//!
//! A pattern mined months ago may no longer describe the household. Drift
//! compares the occurrence rate the pattern was mined at against the rate
//! observed in the recent window; a drifted pattern is kept but ranked
//! down, so a later run can rehabilitate it without re-discovery.

use homesense_core::{Pattern, ScoringConfig};
use tracing::debug;

/// Outcome of a drift assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftStatus {
    Stable,
    Drifted,
}

/// Relative-band drift detector.
pub struct DriftDetector {
    tolerance: f64,
    penalty: f64,
}

impl DriftDetector {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            tolerance: config.drift_tolerance,
            penalty: config.drift_penalty,
        }
    }

    /// Compare the rate at mining time against the recently observed rate.
    /// Drift requires the recent rate to leave the relative tolerance band
    /// strictly; landing exactly on the edge is still stable.
    pub fn assess(&self, original_rate: f64, recent_rate: f64) -> DriftStatus {
        if original_rate <= 0.0 {
            // No baseline to drift from.
            return DriftStatus::Stable;
        }
        let band = self.tolerance * original_rate;
        if (recent_rate - original_rate).abs() > band {
            DriftStatus::Drifted
        } else {
            DriftStatus::Stable
        }
    }

    /// Assess a pattern against the occurrence count seen in the recent
    /// window of `recent_days`.
    pub fn assess_pattern(
        &self,
        pattern: &Pattern,
        recent_occurrences: u32,
        recent_days: f64,
    ) -> DriftStatus {
        let recent_rate = recent_occurrences as f64 / recent_days.max(1.0 / 24.0);
        let status = self.assess(pattern.occurrence_rate(), recent_rate);
        if status == DriftStatus::Drifted {
            debug!(
                pattern_id = %pattern.pattern_id,
                original_rate = pattern.occurrence_rate(),
                recent_rate,
                "pattern drifted"
            );
        }
        status
    }

    /// Ranking score after the drift penalty.
    pub fn rank_score(&self, score: f64, status: DriftStatus) -> f64 {
        match status {
            DriftStatus::Stable => score,
            DriftStatus::Drifted => score * self.penalty,
        }
    }
}
