//! Contextual detector: co-occurrence conditioned on an exogenous context
//! attribute (day type, ambient condition) carried in event attributes.

use std::collections::HashMap;

use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::detectors::pairs::scan_pairs;
use crate::window::EventWindow;

/// The context value must be present in at least this fraction of matches.
const MIN_CONTEXT_FRACTION: f64 = 0.8;
/// Maximum boost applied for a fully consistent context.
const CONTEXT_BOOST: f64 = 0.15;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    let scan = scan_pairs(window, config.co_occurrence_window_secs);
    let mut candidates = Vec::new();

    for ((trigger, target), accum) in &scan.pairs {
        if accum.pair_count < config.min_support {
            continue;
        }
        let base_confidence = scan.confidence(trigger, accum);
        if base_confidence < config.min_pair_confidence {
            continue;
        }

        // Tally attribute values across the matched trigger events; the
        // context qualifies only when one value dominates the matches.
        let mut value_counts: HashMap<(String, String), u32> = HashMap::new();
        let mut value_samples: HashMap<(String, String), serde_json::Value> = HashMap::new();
        for &idx in &accum.matched_trigger_idx {
            let event = scan.transitions[idx];
            for (key, value) in &event.attributes {
                let tally_key = (key.clone(), value.to_string());
                *value_counts.entry(tally_key.clone()).or_insert(0) += 1;
                value_samples.entry(tally_key).or_insert_with(|| value.clone());
            }
        }

        let Some(((context_key, value_repr), count)) =
            value_counts.into_iter().max_by_key(|(_, c)| *c)
        else {
            continue;
        };
        let context_fraction = count as f64 / accum.pair_count as f64;
        if context_fraction < MIN_CONTEXT_FRACTION {
            continue;
        }

        let context_value = value_samples
            .remove(&(context_key.clone(), value_repr))
            .unwrap_or(serde_json::Value::Null);
        let confidence = (base_confidence * (1.0 + CONTEXT_BOOST * context_fraction)).min(1.0);

        candidates.push(PatternCandidate::new(
            PatternKind::Contextual,
            vec![trigger.clone(), target.clone()],
            confidence,
            accum.occurrences.clone(),
            PatternMeta::Contextual {
                trigger: trigger.clone(),
                target: target.clone(),
                context_key,
                context_value,
                context_fraction,
                extra: serde_json::Value::Null,
            },
        ));
    }

    Ok(candidates)
}
