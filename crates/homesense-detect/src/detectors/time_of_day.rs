//! Time-of-day detector: devices entering a state around a consistent hour.

use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::window::{EventWindow, HourCluster};

/// Minimum band fraction for a usable hour cluster.
const MIN_BAND_FRACTION: f64 = 0.5;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    let mut candidates = Vec::new();

    for ((device, state), occurrences) in window.state_entries() {
        if (occurrences.len() as u32) < config.min_support {
            continue;
        }
        let Some(cluster) = HourCluster::from_occurrences(&occurrences) else {
            continue;
        };
        if cluster.band_fraction < MIN_BAND_FRACTION {
            continue;
        }
        candidates.push(PatternCandidate::new(
            PatternKind::TimeOfDay,
            vec![device],
            cluster.weighted_confidence(),
            occurrences,
            PatternMeta::TimeOfDay {
                hour: cluster.mode_hour,
                state,
                band_fraction: cluster.band_fraction,
                extra: serde_json::Value::Null,
            },
        ));
    }

    Ok(candidates)
}
