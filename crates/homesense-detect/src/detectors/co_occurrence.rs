//! Co-occurrence detector: device B follows device A within a fixed window.

use std::collections::HashMap;

use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::detectors::pairs::scan_pairs;
use crate::window::EventWindow;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    let scan = scan_pairs(window, config.co_occurrence_window_secs);

    // Qualifying directed pairs, keyed by the unordered device pair so a
    // symmetric A<->B relationship yields one candidate (the stronger
    // direction wins, canonical id order breaks ties).
    let mut best: HashMap<(String, String), PatternCandidate> = HashMap::new();

    for ((trigger, target), accum) in &scan.pairs {
        if accum.pair_count < config.min_support {
            continue;
        }
        let confidence = scan.confidence(trigger, accum);
        if confidence < config.min_pair_confidence {
            continue;
        }

        let candidate = PatternCandidate::new(
            PatternKind::CoOccurrence,
            vec![trigger.clone(), target.clone()],
            confidence,
            accum.occurrences.clone(),
            PatternMeta::CoOccurrence {
                trigger: trigger.clone(),
                target: target.clone(),
                window_secs: config.co_occurrence_window_secs,
                pair_count: accum.pair_count,
                trigger_count: scan.trigger_counts.get(trigger).copied().unwrap_or(0),
                median_lag_secs: accum.median_lag_secs(),
                extra: serde_json::Value::Null,
            },
        );

        let key = if trigger < target {
            (trigger.clone(), target.clone())
        } else {
            (target.clone(), trigger.clone())
        };
        let replace = match best.get(&key) {
            None => true,
            Some(existing) => {
                candidate.confidence > existing.confidence
                    || (candidate.confidence == existing.confidence
                        && candidate.devices[0] < existing.devices[0])
            }
        };
        if replace {
            best.insert(key, candidate);
        }
    }

    Ok(best.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use homesense_core::Event;

    /// Motion followed by light within 2 minutes, 20 of 22 times
    /// over 30 days.
    #[test]
    fn test_motion_then_light() {
        let mut events = Vec::new();
        for i in 0..22u32 {
            let day = 1 + (i % 28);
            let extra = i / 28;
            let t0 = Utc
                .with_ymd_and_hms(2026, 1 + extra, day, 18, (i % 50) as u32, 0)
                .unwrap();
            events.push(
                Event::new("binary_sensor.motion_hall", "motion_hall", "on", t0)
                    .with_previous_state("off"),
            );
            if i < 20 {
                events.push(
                    Event::new("light.hall", "light_hall", "on", t0 + Duration::seconds(90))
                        .with_previous_state("off"),
                );
            }
        }
        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.support(), 20);
        assert!(
            (c.confidence - 20.0 / 22.0).abs() < 1e-9,
            "confidence was {}",
            c.confidence
        );
        match &c.meta {
            PatternMeta::CoOccurrence {
                trigger,
                target,
                pair_count,
                trigger_count,
                ..
            } => {
                assert_eq!(trigger, "motion_hall");
                assert_eq!(target, "light_hall");
                assert_eq!(*pair_count, 20);
                assert_eq!(*trigger_count, 22);
            }
            other => panic!("unexpected meta: {other:?}"),
        }
    }

    #[test]
    fn test_symmetric_pair_deduplicated() {
        let mut events = Vec::new();
        // a -> b tightly every time, and b -> a only sometimes (next day's a).
        for day in 1..=10 {
            let t0 = Utc.with_ymd_and_hms(2026, 1, day, 8, 0, 0).unwrap();
            events.push(Event::new("x.a", "a", "on", t0).with_previous_state("off"));
            events.push(
                Event::new("x.b", "b", "on", t0 + Duration::seconds(30)).with_previous_state("off"),
            );
        }
        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert_eq!(candidates.len(), 1);
        match &candidates[0].meta {
            PatternMeta::CoOccurrence { trigger, .. } => assert_eq!(trigger, "a"),
            other => panic!("unexpected meta: {other:?}"),
        }
    }

    #[test]
    fn test_equal_confidence_tie_resolves_to_lesser_trigger() {
        let mut events = Vec::new();
        // The pair alternates direction day by day, so both directions
        // end at exactly P = 0.5.
        for day in 1..=10u32 {
            let t0 = Utc.with_ymd_and_hms(2026, 1, day, 8, 0, 0).unwrap();
            let (first, second) = if day % 2 == 0 { ("a", "b") } else { ("b", "a") };
            events.push(
                Event::new(format!("x.{first}"), first, "on", t0).with_previous_state("off"),
            );
            events.push(
                Event::new(format!("x.{second}"), second, "on", t0 + Duration::seconds(30))
                    .with_previous_state("off"),
            );
        }
        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();

        assert_eq!(candidates.len(), 1);
        match &candidates[0].meta {
            PatternMeta::CoOccurrence { trigger, .. } => assert_eq!(trigger, "a"),
            other => panic!("unexpected meta: {other:?}"),
        }
    }

    #[test]
    fn test_low_confidence_pair_rejected() {
        let mut events = Vec::new();
        // a fires 20 times, b follows only 4 times: P = 0.2 < 0.4.
        for day in 1..=20 {
            let t0 = Utc.with_ymd_and_hms(2026, 1, day, 8, 0, 0).unwrap();
            events.push(Event::new("x.a", "a", "on", t0).with_previous_state("off"));
            if day % 5 == 0 {
                events.push(
                    Event::new("x.b", "b", "on", t0 + Duration::seconds(30))
                        .with_previous_state("off"),
                );
            }
        }
        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert!(candidates.is_empty());
    }
}
