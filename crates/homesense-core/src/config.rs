//! Engine configuration.
//!
//! All thresholds live here so the detectors, synergy search, scoring and
//! scheduler never hard-code their own constants. Defaults are collected in
//! the [`defaults`] module.

use serde::{Deserialize, Serialize};

/// Default values for every tunable.
pub mod defaults {
    /// Minimum occurrences before any detector emits a candidate.
    pub const MIN_SUPPORT: u32 = 3;
    /// Co-occurrence window between trigger and target, seconds.
    pub const CO_OCCURRENCE_WINDOW_SECS: i64 = 300;
    /// Minimum conditional probability for a co-occurrence candidate.
    pub const MIN_PAIR_CONFIDENCE: f64 = 0.4;
    /// Total window for a 3+ step sequence, seconds.
    pub const SEQUENCE_WINDOW_SECS: i64 = 600;
    /// Inactivity gap that closes a session, seconds.
    pub const SESSION_GAP_SECS: i64 = 1800;
    /// Minimum historical span for seasonal detection, days.
    pub const SEASONAL_MIN_SPAN_DAYS: f64 = 90.0;
    /// Maximum coefficient of variation for a consistent duration.
    pub const DURATION_MAX_CV: f64 = 0.35;

    /// Maximum chain depth explored by the synergy search.
    pub const MAX_CHAIN_DEPTH: usize = 4;
    /// Abandon a partial chain when its edge-weight product drops below this.
    pub const PRUNE_FLOOR: f64 = 0.15;
    /// Minimum pattern confidence for `validated_by_patterns`.
    pub const MIN_VALIDATING_CONFIDENCE: f64 = 0.5;

    /// Recency decay half-life, days.
    pub const RECENCY_HALF_LIFE_DAYS: f64 = 14.0;
    /// Relative tolerance band for drift detection.
    pub const DRIFT_TOLERANCE: f64 = 0.5;
    /// Ranking down-weight applied to drifted targets.
    pub const DRIFT_PENALTY: f64 = 0.5;
    /// Calibration learning rate.
    pub const CALIBRATION_LEARNING_RATE: f64 = 0.05;
    /// Maximum per-weight change in one calibration cycle.
    pub const CALIBRATION_MAX_STEP: f64 = 0.1;

    /// Read cache TTL, seconds.
    pub const CACHE_TTL_SECS: u64 = 300;
    /// Read cache capacity, entries.
    pub const CACHE_CAPACITY: u64 = 256;
    /// Interactive read deadline, milliseconds.
    pub const READ_DEADLINE_MS: u64 = 200;

    /// Batch cadence, seconds (daily).
    pub const MINING_INTERVAL_SECS: u64 = 86_400;
    /// Rolling history window, days.
    pub const HISTORY_WINDOW_DAYS: i64 = 30;
}

/// Thresholds shared by the pattern detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum occurrences before a candidate is emitted.
    pub min_support: u32,
    /// Co-occurrence trigger-to-target window, seconds.
    pub co_occurrence_window_secs: i64,
    /// Minimum P(target | trigger) for pair candidates.
    pub min_pair_confidence: f64,
    /// Total window for sequence chains, seconds.
    pub sequence_window_secs: i64,
    /// Inactivity gap closing a session, seconds.
    pub session_gap_secs: i64,
    /// Minimum historical span before seasonal detection runs, days.
    pub seasonal_min_span_days: f64,
    /// Maximum coefficient of variation for duration consistency.
    pub duration_max_cv: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_support: defaults::MIN_SUPPORT,
            co_occurrence_window_secs: defaults::CO_OCCURRENCE_WINDOW_SECS,
            min_pair_confidence: defaults::MIN_PAIR_CONFIDENCE,
            sequence_window_secs: defaults::SEQUENCE_WINDOW_SECS,
            session_gap_secs: defaults::SESSION_GAP_SECS,
            seasonal_min_span_days: defaults::SEASONAL_MIN_SPAN_DAYS,
            duration_max_cv: defaults::DURATION_MAX_CV,
        }
    }
}

impl DetectorConfig {
    pub fn with_min_support(mut self, min_support: u32) -> Self {
        self.min_support = min_support.max(1);
        self
    }

    pub fn with_co_occurrence_window_secs(mut self, secs: i64) -> Self {
        self.co_occurrence_window_secs = secs.max(1);
        self
    }

    pub fn with_min_pair_confidence(mut self, confidence: f64) -> Self {
        self.min_pair_confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Synergy search tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyConfig {
    /// Maximum chain depth (device count).
    pub max_chain_depth: usize,
    /// Edge-weight-product pruning floor.
    pub prune_floor: f64,
    /// Minimum pattern confidence for `validated_by_patterns`.
    pub min_validating_confidence: f64,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: defaults::MAX_CHAIN_DEPTH,
            prune_floor: defaults::PRUNE_FLOOR,
            min_validating_confidence: defaults::MIN_VALIDATING_CONFIDENCE,
        }
    }
}

/// Ensemble scoring, drift and calibration tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Recency decay half-life, days.
    pub recency_half_life_days: f64,
    /// Relative drift tolerance band.
    pub drift_tolerance: f64,
    /// Multiplicative ranking penalty for drifted targets.
    pub drift_penalty: f64,
    /// Calibration learning rate.
    pub learning_rate: f64,
    /// Per-weight clamp for one calibration cycle.
    pub max_step: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recency_half_life_days: defaults::RECENCY_HALF_LIFE_DAYS,
            drift_tolerance: defaults::DRIFT_TOLERANCE,
            drift_penalty: defaults::DRIFT_PENALTY,
            learning_rate: defaults::CALIBRATION_LEARNING_RATE,
            max_step: defaults::CALIBRATION_MAX_STEP,
        }
    }
}

/// Read-path cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: u64,
    /// Interactive read deadline, milliseconds.
    pub read_deadline_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::CACHE_TTL_SECS,
            capacity: defaults::CACHE_CAPACITY,
            read_deadline_ms: defaults::READ_DEADLINE_MS,
        }
    }
}

/// Batch scheduler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduled mining runs.
    pub interval_secs: u64,
    /// Rolling event-history window, days.
    pub history_window_days: i64,
    /// Opt-in event retention, days. `None` never deletes history; when
    /// set, the cutoff is floored at the seasonal detection span so a
    /// short retention cannot starve the seasonal detector.
    #[serde(default)]
    pub retention_days: Option<i64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::MINING_INTERVAL_SECS,
            history_window_days: defaults::HISTORY_WINDOW_DAYS,
            retention_days: None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiningConfig {
    pub detector: DetectorConfig,
    pub synergy: SynergyConfig,
    pub scoring: ScoringConfig,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
}

impl MiningConfig {
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_synergy(mut self, synergy: SynergyConfig) -> Self {
        self.synergy = synergy;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MiningConfig::default();
        assert_eq!(config.detector.min_support, 3);
        assert_eq!(config.detector.co_occurrence_window_secs, 300);
        assert_eq!(config.synergy.max_chain_depth, 4);
        assert_eq!(config.scheduler.interval_secs, 86_400);
    }

    #[test]
    fn test_builders_clamp() {
        let detector = DetectorConfig::default()
            .with_min_support(0)
            .with_min_pair_confidence(1.5);
        assert_eq!(detector.min_support, 1);
        assert_eq!(detector.min_pair_confidence, 1.0);
    }
}
