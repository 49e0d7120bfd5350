//! Room-based detector: co-occurrence restricted to devices sharing an area.

use std::collections::BTreeSet;

use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::detectors::pairs::scan_pairs;
use crate::window::EventWindow;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    let areas: BTreeSet<String> = window
        .events()
        .iter()
        .filter_map(|e| e.area_id.clone())
        .collect();

    let mut candidates = Vec::new();
    for area in areas {
        let area_window = window.filtered(|e| e.area_id.as_deref() == Some(area.as_str()));
        let scan = scan_pairs(&area_window, config.co_occurrence_window_secs);

        for ((trigger, target), accum) in &scan.pairs {
            if accum.pair_count < config.min_support {
                continue;
            }
            let confidence = scan.confidence(trigger, accum);
            if confidence < config.min_pair_confidence {
                continue;
            }
            candidates.push(PatternCandidate::new(
                PatternKind::RoomBased,
                vec![trigger.clone(), target.clone()],
                confidence,
                accum.occurrences.clone(),
                PatternMeta::RoomBased {
                    area_id: area.clone(),
                    trigger: trigger.clone(),
                    target: target.clone(),
                    pair_count: accum.pair_count,
                    extra: serde_json::Value::Null,
                },
            ));
        }
    }

    Ok(candidates)
}
