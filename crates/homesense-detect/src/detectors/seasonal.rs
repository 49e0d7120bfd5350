//! Seasonal detector: behavior split by season bucket.
//!
//! Requires at least one full season of historical span; below that the
//! detector emits nothing rather than inventing a seasonal signal.

use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result, Season};

use crate::candidate::PatternCandidate;
use crate::window::{EventWindow, HourCluster, season_of};

/// Bucket consistency floor.
const MIN_BAND_FRACTION: f64 = 0.6;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    if window.span_days() < config.seasonal_min_span_days {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for ((device, state), occurrences) in window.state_entries() {
        for season in [
            Season::Winter,
            Season::Spring,
            Season::Summer,
            Season::Autumn,
        ] {
            let bucket: Vec<_> = occurrences
                .iter()
                .copied()
                .filter(|ts| season_of(*ts) == season)
                .collect();
            if (bucket.len() as u32) < config.min_support {
                continue;
            }
            let Some(cluster) = HourCluster::from_occurrences(&bucket) else {
                continue;
            };
            if cluster.band_fraction < MIN_BAND_FRACTION {
                continue;
            }
            candidates.push(PatternCandidate::new(
                PatternKind::Seasonal,
                vec![device.clone()],
                cluster.weighted_confidence(),
                bucket,
                PatternMeta::Seasonal {
                    season,
                    hour: cluster.mode_hour,
                    state: state.clone(),
                    band_fraction: cluster.band_fraction,
                    extra: serde_json::Value::Null,
                },
            ));
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use homesense_core::Event;

    fn winter_heater(months: &[u32]) -> Vec<Event> {
        let mut events = Vec::new();
        for &month in months {
            for day in [3, 8, 13, 18, 23] {
                let ts = Utc.with_ymd_and_hms(2026, month, day, 6, 0, 0).unwrap();
                events.push(
                    Event::new("climate.heater", "heater", "heat", ts)
                        .with_previous_state("off"),
                );
            }
        }
        events
    }

    #[test]
    fn test_seasonal_pattern_over_sufficient_span() {
        // January through May: span well over one season.
        let window = EventWindow::new(winter_heater(&[1, 2, 3, 4, 5]));
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert!(candidates.iter().any(|c| {
            matches!(&c.meta, PatternMeta::Seasonal { season, .. } if *season == Season::Winter)
        }));
    }

    #[test]
    fn test_short_span_emits_nothing() {
        // Only January: under one full season of data.
        let window = EventWindow::new(winter_heater(&[1]));
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert!(candidates.is_empty());
    }
}
