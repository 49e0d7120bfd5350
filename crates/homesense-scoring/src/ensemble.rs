//! Ensemble ranking scores.
//!
//! Every pattern and synergy is ranked by a weighted combination of four
//! components, each already in [0,1]. The weights are L1-normalized and
//! versioned so the calibration loop can evolve them without breaking
//! comparability within one batch.

use chrono::{DateTime, Utc};
use homesense_core::{FeedbackRecord, Pattern, ScoringConfig, Synergy};
use serde::{Deserialize, Serialize};

/// Support count at which the evidence component reaches 0.5.
const EVIDENCE_HALF_POINT: f64 = 10.0;

/// Component values feeding one ensemble score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreComponents {
    /// Detector- or search-assigned confidence.
    pub base: f64,
    /// Exponential decay on time since last observation.
    pub recency: f64,
    /// Smoothed acceptance rate from user feedback.
    pub feedback: f64,
    /// Supporting evidence: occurrence volume for patterns, pattern
    /// support for synergies.
    pub evidence: f64,
}

impl ScoreComponents {
    /// Weighted combination, clamped to [0,1].
    pub fn combine(&self, weights: &EnsembleWeights) -> f64 {
        (weights.base * self.base
            + weights.recency * self.recency
            + weights.feedback * self.feedback
            + weights.evidence * self.evidence)
            .clamp(0.0, 1.0)
    }
}

/// Versioned, L1-normalized ensemble weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub base: f64,
    pub recency: f64,
    pub feedback: f64,
    pub evidence: f64,
    /// Bumped once per calibration cycle.
    pub version: u32,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            base: 0.4,
            recency: 0.2,
            feedback: 0.25,
            evidence: 0.15,
            version: 1,
        }
    }
}

impl EnsembleWeights {
    pub fn sum(&self) -> f64 {
        self.base + self.recency + self.feedback + self.evidence
    }

    /// Rescale so the weights sum to 1.
    pub fn normalize(&mut self) {
        let sum = self.sum();
        if sum > f64::EPSILON {
            self.base /= sum;
            self.recency /= sum;
            self.feedback /= sum;
            self.evidence /= sum;
        }
    }
}

/// Scores patterns and synergies against one weight vector.
pub struct EnsembleScorer {
    weights: EnsembleWeights,
    half_life_days: f64,
}

impl EnsembleScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: EnsembleWeights::default(),
            half_life_days: config.recency_half_life_days,
        }
    }

    pub fn with_weights(mut self, weights: EnsembleWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    /// Component breakdown for a pattern. `feedback` holds only records
    /// targeting this pattern.
    pub fn pattern_components(
        &self,
        pattern: &Pattern,
        feedback: &[FeedbackRecord],
        now: DateTime<Utc>,
    ) -> ScoreComponents {
        let support = pattern.support_count as f64;
        ScoreComponents {
            base: pattern.confidence,
            recency: self.recency_decay(pattern.window.last_seen, now),
            feedback: acceptance_rate(feedback),
            evidence: support / (support + EVIDENCE_HALF_POINT),
        }
    }

    /// Component breakdown for a synergy.
    pub fn synergy_components(
        &self,
        synergy: &Synergy,
        feedback: &[FeedbackRecord],
        now: DateTime<Utc>,
    ) -> ScoreComponents {
        ScoreComponents {
            base: synergy.confidence,
            recency: self.recency_decay(synergy.updated_at, now),
            feedback: acceptance_rate(feedback),
            evidence: synergy.pattern_support,
        }
    }

    pub fn score_pattern(
        &self,
        pattern: &Pattern,
        feedback: &[FeedbackRecord],
        now: DateTime<Utc>,
    ) -> f64 {
        self.pattern_components(pattern, feedback, now)
            .combine(&self.weights)
    }

    pub fn score_synergy(
        &self,
        synergy: &Synergy,
        feedback: &[FeedbackRecord],
        now: DateTime<Utc>,
    ) -> f64 {
        self.synergy_components(synergy, feedback, now)
            .combine(&self.weights)
    }

    /// Half-life decay on the age of the last observation. Future
    /// timestamps count as age zero.
    fn recency_decay(&self, last_seen: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_days = (now - last_seen).num_seconds().max(0) as f64 / 86_400.0;
        (-std::f64::consts::LN_2 * age_days / self.half_life_days.max(f64::EPSILON)).exp()
    }
}

/// Laplace-smoothed acceptance rate; neutral 0.5 with no feedback.
fn acceptance_rate(feedback: &[FeedbackRecord]) -> f64 {
    let total: f64 = feedback.iter().map(|f| f.acceptance_score()).sum();
    (total + 1.0) / (feedback.len() as f64 + 2.0)
}
