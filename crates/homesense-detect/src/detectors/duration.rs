//! Duration detector: statistically consistent dwell times in a state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::window::EventWindow;

/// Dwells shorter than this are sensor bounce, not behavior.
const MIN_DWELL_SECS: i64 = 10;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    // Dwell time of a state = gap until the device's next transition.
    let mut dwells: HashMap<(String, String), Vec<(DateTime<Utc>, f64)>> = HashMap::new();
    for (device, events) in window.transitions_by_device() {
        for pair in events.windows(2) {
            let dwell_secs = (pair[1].timestamp - pair[0].timestamp).num_seconds();
            if dwell_secs < MIN_DWELL_SECS {
                continue;
            }
            dwells
                .entry((device.clone(), pair[0].state.clone()))
                .or_default()
                .push((pair[0].timestamp, dwell_secs as f64));
        }
    }

    let mut candidates = Vec::new();
    for ((device, state), samples) in dwells {
        let n = samples.len();
        if (n as u32) < config.min_support {
            continue;
        }
        let values: Vec<f64> = samples.iter().map(|(_, d)| *d).collect();
        let mean = values.iter().sum::<f64>() / n as f64;
        if mean <= 0.0 {
            continue;
        }
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let std_dev = variance.sqrt();
        let cv = std_dev / mean;
        if cv > config.duration_max_cv {
            continue;
        }

        let weight = n as f64 / (n as f64 + 3.0);
        let confidence = ((1.0 - cv) * weight).clamp(0.0, 1.0);
        let occurrences: Vec<DateTime<Utc>> = samples.iter().map(|(ts, _)| *ts).collect();

        candidates.push(PatternCandidate::new(
            PatternKind::Duration,
            vec![device],
            confidence,
            occurrences,
            PatternMeta::Duration {
                state,
                mean_secs: mean,
                std_dev_secs: std_dev,
                samples: n as u32,
                extra: serde_json::Value::Null,
            },
        ));
    }

    Ok(candidates)
}
