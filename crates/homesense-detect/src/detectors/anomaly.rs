//! Anomaly detector: occurrences deviating from an established time-of-day
//! expectation.
//!
//! Output feeds alerts, not automation suggestions; confidence here is
//! anomaly strength, not occurrence frequency.

use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::window::{EventWindow, HourCluster, hour_distance};

use chrono::Timelike;

/// Band fraction required before behavior counts as established.
const ESTABLISHED_BAND_FRACTION: f64 = 0.7;
/// Circular hour distance from the mode that makes an occurrence deviant.
const DEVIATION_HOURS: u32 = 3;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    let mut candidates = Vec::new();

    for ((device, _state), occurrences) in window.state_entries() {
        // Established behavior needs twice the normal support floor.
        if (occurrences.len() as u32) < config.min_support * 2 {
            continue;
        }
        let Some(cluster) = HourCluster::from_occurrences(&occurrences) else {
            continue;
        };
        if cluster.band_fraction < ESTABLISHED_BAND_FRACTION {
            continue;
        }

        let deviants: Vec<_> = occurrences
            .iter()
            .copied()
            .filter(|ts| hour_distance(ts.hour(), cluster.mode_hour as u32) > DEVIATION_HOURS)
            .collect();
        if deviants.is_empty() {
            continue;
        }

        let worst = deviants
            .iter()
            .copied()
            .max_by_key(|ts| hour_distance(ts.hour(), cluster.mode_hour as u32))
            .unwrap_or(deviants[0]);
        let deviation_hours =
            hour_distance(worst.hour(), cluster.mode_hour as u32) as f64;
        // Strength: how far outside the expected band, scaled to the
        // maximum possible circular distance.
        let confidence = (deviation_hours / 12.0).clamp(0.0, 1.0);

        candidates.push(PatternCandidate::new(
            PatternKind::Anomaly,
            vec![device],
            confidence,
            deviants,
            PatternMeta::Anomaly {
                expected_hour: cluster.mode_hour,
                observed_at: worst,
                deviation_hours,
                extra: serde_json::Value::Null,
            },
        ));
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use homesense_core::Event;

    #[test]
    fn test_deviant_occurrence_flagged() {
        let mut events = Vec::new();
        // Front door opens around 18:00 every day...
        for day in 1..=12 {
            let ts = Utc.with_ymd_and_hms(2026, 1, day, 18, 5, 0).unwrap();
            events.push(
                Event::new("binary_sensor.door", "front_door", "open", ts)
                    .with_previous_state("closed"),
            );
        }
        // ...and once at 03:00.
        events.push(
            Event::new(
                "binary_sensor.door",
                "front_door",
                "open",
                Utc.with_ymd_and_hms(2026, 1, 13, 3, 0, 0).unwrap(),
            )
            .with_previous_state("closed"),
        );

        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.support(), 1);
        match &c.meta {
            PatternMeta::Anomaly {
                expected_hour,
                deviation_hours,
                ..
            } => {
                assert_eq!(*expected_hour, 18);
                assert!(*deviation_hours >= 9.0);
            }
            other => panic!("unexpected meta: {other:?}"),
        }
        assert!(c.confidence > 0.7);
    }

    #[test]
    fn test_consistent_behavior_not_flagged() {
        let mut events = Vec::new();
        for day in 1..=12 {
            let ts = Utc.with_ymd_and_hms(2026, 1, day, 18, 5, 0).unwrap();
            events.push(
                Event::new("binary_sensor.door", "front_door", "open", ts)
                    .with_previous_state("closed"),
            );
        }
        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert!(candidates.is_empty());
    }
}
