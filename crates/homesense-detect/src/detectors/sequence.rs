//! Sequence detector: ordered 3+ step device chains repeating in a bounded
//! total window.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::window::EventWindow;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    let transitions: Vec<_> = window.transitions().collect();

    let mut trigger_counts: HashMap<&str, u32> = HashMap::new();
    for event in &transitions {
        *trigger_counts.entry(event.device_id.as_str()).or_insert(0) += 1;
    }

    // For each transition, follow the next two distinct-device transitions
    // inside the total window. This captures the immediate A->B->C chain
    // without enumerating every device triple.
    let mut chains: HashMap<[String; 3], Vec<DateTime<Utc>>> = HashMap::new();
    for (i, first) in transitions.iter().enumerate() {
        let deadline = first.timestamp + chrono::Duration::seconds(config.sequence_window_secs);
        let mut second: Option<&str> = None;
        for follow in transitions.iter().skip(i + 1) {
            if follow.timestamp > deadline {
                break;
            }
            let device = follow.device_id.as_str();
            if device == first.device_id {
                continue;
            }
            match second {
                None => second = Some(device),
                Some(mid) => {
                    if device == mid {
                        continue;
                    }
                    chains
                        .entry([
                            first.device_id.clone(),
                            mid.to_string(),
                            device.to_string(),
                        ])
                        .or_default()
                        .push(first.timestamp);
                    break;
                }
            }
        }
    }

    let mut candidates = Vec::new();
    for (order, occurrences) in chains {
        let repeats = occurrences.len() as u32;
        if repeats < config.min_support {
            continue;
        }
        let trigger_count = trigger_counts.get(order[0].as_str()).copied().unwrap_or(0);
        if trigger_count == 0 {
            continue;
        }
        let confidence = repeats as f64 / trigger_count as f64;
        if confidence < config.min_pair_confidence {
            continue;
        }
        candidates.push(PatternCandidate::new(
            PatternKind::Sequence,
            order.to_vec(),
            confidence,
            occurrences,
            PatternMeta::Sequence {
                order: order.to_vec(),
                window_secs: config.sequence_window_secs,
                repeats,
                extra: serde_json::Value::Null,
            },
        ));
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use homesense_core::Event;

    fn evening_chain(days: u32) -> Vec<Event> {
        let mut events = Vec::new();
        for day in 1..=days {
            let t0 = Utc.with_ymd_and_hms(2026, 1, day, 19, 0, 0).unwrap();
            events.push(Event::new("x.door", "door", "open", t0).with_previous_state("closed"));
            events.push(
                Event::new("x.hall_light", "hall_light", "on", t0 + Duration::seconds(20))
                    .with_previous_state("off"),
            );
            events.push(
                Event::new("x.tv", "tv", "playing", t0 + Duration::seconds(120))
                    .with_previous_state("idle"),
            );
        }
        events
    }

    #[test]
    fn test_repeated_chain_detected() {
        let window = EventWindow::new(evening_chain(8));
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.confidence, 1.0);
        match &c.meta {
            PatternMeta::Sequence { order, repeats, .. } => {
                assert_eq!(order, &["door", "hall_light", "tv"]);
                assert_eq!(*repeats, 8);
            }
            other => panic!("unexpected meta: {other:?}"),
        }
    }

    #[test]
    fn test_chain_outside_window_not_counted() {
        let mut events = Vec::new();
        for day in 1..=8 {
            let t0 = Utc.with_ymd_and_hms(2026, 1, day, 19, 0, 0).unwrap();
            events.push(Event::new("x.door", "door", "open", t0).with_previous_state("closed"));
            events.push(
                Event::new("x.hall_light", "hall_light", "on", t0 + Duration::seconds(20))
                    .with_previous_state("off"),
            );
            // Third step lands past the 600s sequence window.
            events.push(
                Event::new("x.tv", "tv", "playing", t0 + Duration::seconds(700))
                    .with_previous_state("idle"),
            );
        }
        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_two_step_chain_not_emitted() {
        let mut events = Vec::new();
        for day in 1..=8 {
            let t0 = Utc.with_ymd_and_hms(2026, 1, day, 19, 0, 0).unwrap();
            events.push(Event::new("x.door", "door", "open", t0).with_previous_state("closed"));
            events.push(
                Event::new("x.hall_light", "hall_light", "on", t0 + Duration::seconds(20))
                    .with_previous_state("off"),
            );
        }
        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert!(candidates.is_empty());
    }
}
