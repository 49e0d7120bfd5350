//! Feedback-driven weight calibration.
//!
//! Once per mining cycle the calibrator replays accumulated feedback
//! against the component breakdowns that produced each score, and nudges
//! the ensemble weights toward the components that predicted acceptance.
//! Movement per weight per cycle is clamped so one noisy batch cannot
//! swing the ranking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use homesense_core::ScoringConfig;

use crate::ensemble::{EnsembleWeights, ScoreComponents};

/// Weights never calibrate below this floor.
const WEIGHT_FLOOR: f64 = 0.01;

/// One scored target joined with the user's verdict on it.
#[derive(Debug, Clone)]
pub struct Observation {
    pub components: ScoreComponents,
    /// Acceptance in [0,1] from [`FeedbackRecord::acceptance_score`].
    ///
    /// [`FeedbackRecord::acceptance_score`]: homesense_core::FeedbackRecord::acceptance_score
    pub acceptance: f64,
}

/// Persisted calibration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationState {
    pub weights: EnsembleWeights,
    /// Total observations ever applied.
    pub updates_applied: u64,
    pub last_calibrated: Option<DateTime<Utc>>,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            weights: EnsembleWeights::default(),
            updates_applied: 0,
            last_calibrated: None,
        }
    }
}

/// Bounded gradient-style weight updater.
pub struct Calibrator {
    learning_rate: f64,
    max_step: f64,
}

impl Calibrator {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            max_step: config.max_step,
        }
    }

    /// Apply one calibration cycle over the batch. Empty batches leave the
    /// state untouched, version included.
    pub fn calibrate(&self, state: &mut CalibrationState, observations: &[Observation]) {
        if observations.is_empty() {
            return;
        }
        let start = state.weights.clone();
        let mut weights = start.clone();

        for obs in observations {
            let predicted = obs.components.combine(&weights);
            let error = obs.acceptance - predicted;
            weights.base += self.learning_rate * error * obs.components.base;
            weights.recency += self.learning_rate * error * obs.components.recency;
            weights.feedback += self.learning_rate * error * obs.components.feedback;
            weights.evidence += self.learning_rate * error * obs.components.evidence;
        }

        weights.base = self.clamp_step(start.base, weights.base);
        weights.recency = self.clamp_step(start.recency, weights.recency);
        weights.feedback = self.clamp_step(start.feedback, weights.feedback);
        weights.evidence = self.clamp_step(start.evidence, weights.evidence);
        weights.normalize();
        weights.version = start.version + 1;

        info!(
            version = weights.version,
            observations = observations.len(),
            "calibration cycle applied"
        );
        state.weights = weights;
        state.updates_applied += observations.len() as u64;
        state.last_calibrated = Some(Utc::now());
    }

    /// Clamp one cycle's movement to the configured step, and keep the
    /// weight above the floor.
    fn clamp_step(&self, original: f64, updated: f64) -> f64 {
        updated
            .clamp(original - self.max_step, original + self.max_step)
            .max(WEIGHT_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrator() -> Calibrator {
        Calibrator::new(&ScoringConfig::default())
    }

    fn rejected_high_base() -> Observation {
        // Confident, well-evidenced suggestion the user rejected anyway.
        Observation {
            components: ScoreComponents {
                base: 0.9,
                recency: 0.9,
                feedback: 0.1,
                evidence: 0.9,
            },
            acceptance: 0.0,
        }
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let mut state = CalibrationState::default();
        calibrator().calibrate(&mut state, &[]);
        assert_eq!(state.weights.version, 1);
        assert_eq!(state.updates_applied, 0);
        assert!(state.last_calibrated.is_none());
    }

    #[test]
    fn test_rejections_shift_weight_toward_feedback() {
        let mut state = CalibrationState::default();
        let start_share = state.weights.feedback / state.weights.sum();
        let batch = vec![rejected_high_base(); 5];
        calibrator().calibrate(&mut state, &batch);

        // Components that over-promised lose share to the one that agreed
        // with the verdict.
        let end_share = state.weights.feedback / state.weights.sum();
        assert!(end_share > start_share);
        assert_eq!(state.weights.version, 2);
        assert_eq!(state.updates_applied, 5);
        assert!(state.last_calibrated.is_some());
    }

    #[test]
    fn test_cycle_movement_is_bounded() {
        // An absurd learning rate must still move each weight at most one
        // step before renormalization.
        let config = ScoringConfig {
            learning_rate: 50.0,
            ..Default::default()
        };
        let calibrator = Calibrator::new(&config);
        let start = EnsembleWeights::default();
        let clamped = calibrator.clamp_step(start.base, start.base - 3.0);
        assert!((clamped - (start.base - config.max_step)).abs() < 1e-9);

        let mut state = CalibrationState::default();
        calibrator.calibrate(&mut state, &[rejected_high_base()]);
        assert!((state.weights.sum() - 1.0).abs() < 1e-9);
        for w in [
            state.weights.base,
            state.weights.recency,
            state.weights.feedback,
            state.weights.evidence,
        ] {
            assert!(w >= WEIGHT_FLOOR / state.weights.sum() - 1e-9);
        }
    }

    #[test]
    fn test_weights_stay_normalized() {
        let mut state = CalibrationState::default();
        for _ in 0..10 {
            calibrator().calibrate(&mut state, &[rejected_high_base()]);
        }
        assert!((state.weights.sum() - 1.0).abs() < 1e-9);
        assert_eq!(state.weights.version, 11);
    }
}
