//! Pattern deduplication and merging across mining runs.
//!
//! Candidates are keyed by `(kind, canonical devices)`. A candidate matching
//! a persisted pattern accumulates into it; support never decreases, and the
//! merged confidence can never wipe out a previously strong signal.
//! Candidates of different kinds over the same device set are kept apart:
//! they describe different behavioral facets.

use std::collections::HashMap;

use chrono::Utc;
use homesense_core::{Pattern, TimeWindowStats};
use tracing::debug;

use crate::candidate::PatternCandidate;

/// Result of merging one run's candidates into the persisted set.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Full updated pattern set (existing + new).
    pub patterns: Vec<Pattern>,
    /// Patterns created this run.
    pub inserted: usize,
    /// Existing patterns that accumulated new evidence.
    pub merged: usize,
}

/// Collapses overlapping candidates into persisted patterns.
#[derive(Debug, Default)]
pub struct PatternMerger;

impl PatternMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge a run's candidates into the existing persisted patterns.
    pub fn merge_run(
        &self,
        existing: Vec<Pattern>,
        candidates: Vec<PatternCandidate>,
    ) -> MergeOutcome {
        let mut by_id: HashMap<String, Pattern> = existing
            .into_iter()
            .map(|p| (p.pattern_id.clone(), p))
            .collect();

        let mut inserted = 0;
        let mut merged = 0;
        for candidate in Self::combine_within_run(candidates) {
            let id = candidate.pattern_id();
            match by_id.get_mut(&id) {
                Some(pattern) => {
                    Self::merge_into(pattern, &candidate);
                    merged += 1;
                }
                None => {
                    if let Some(pattern) = candidate.into_pattern() {
                        by_id.insert(id, pattern);
                        inserted += 1;
                    }
                }
            }
        }

        debug!(inserted, merged, total = by_id.len(), "merge complete");
        MergeOutcome {
            patterns: by_id.into_values().collect(),
            inserted,
            merged,
        }
    }

    /// Collapse same-key candidates emitted within a single run: evidence is
    /// unioned by occurrence timestamp and the stronger meta wins.
    fn combine_within_run(candidates: Vec<PatternCandidate>) -> Vec<PatternCandidate> {
        let mut by_id: HashMap<String, PatternCandidate> = HashMap::new();
        for candidate in candidates {
            let id = candidate.pattern_id();
            match by_id.get_mut(&id) {
                None => {
                    by_id.insert(id, candidate);
                }
                Some(held) => {
                    let mut occurrences = held.occurrences.clone();
                    occurrences.extend(candidate.occurrences.iter().copied());
                    occurrences.sort();
                    occurrences.dedup();
                    let (confidence, meta) = if candidate.confidence > held.confidence {
                        (candidate.confidence, candidate.meta.clone())
                    } else {
                        (held.confidence, held.meta.clone())
                    };
                    *held = PatternCandidate::new(
                        held.kind,
                        held.devices.clone(),
                        confidence,
                        occurrences,
                        meta,
                    );
                }
            }
        }
        by_id.into_values().collect()
    }

    /// Accumulate a candidate into an existing pattern.
    ///
    /// Only occurrences newer than the pattern's `last_seen` count as new
    /// evidence, which makes re-merging the identical candidate a no-op for
    /// support (idempotence) and prevents double counting when mining
    /// windows overlap.
    fn merge_into(pattern: &mut Pattern, candidate: &PatternCandidate) {
        let new_occurrences: Vec<_> = candidate
            .occurrences
            .iter()
            .copied()
            .filter(|ts| *ts > pattern.window.last_seen)
            .collect();
        pattern.last_validated_at = Utc::now();

        let new_count = new_occurrences.len() as u32;
        if new_count == 0 {
            return;
        }

        if let Some(new_stats) = TimeWindowStats::from_occurrences(&new_occurrences) {
            pattern.window.extend(&new_stats);
        }
        let old_support = pattern.support_count;
        pattern.support_count = pattern.support_count.saturating_add(new_count);
        pattern.meta = candidate.meta.clone();

        pattern.set_confidence(Self::merged_confidence(
            pattern.confidence,
            old_support,
            candidate.confidence,
            new_count,
        ));
    }

    /// Support-weighted confidence combination, floored so the stronger
    /// signal cannot be washed out: the result never falls below the
    /// stronger side's confidence minus a tenth of the weaker side's
    /// support share.
    fn merged_confidence(
        old_confidence: f64,
        old_support: u32,
        new_confidence: f64,
        new_support: u32,
    ) -> f64 {
        let total = (old_support + new_support) as f64;
        let weighted =
            (old_confidence * old_support as f64 + new_confidence * new_support as f64) / total;

        let (stronger, weaker_support) = if old_confidence >= new_confidence {
            (old_confidence, new_support)
        } else {
            (new_confidence, old_support)
        };
        let floor = stronger - 0.1 * (weaker_support as f64 / total);
        weighted.max(floor).clamp(0.0, 1.0)
    }
}
