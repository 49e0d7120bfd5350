//! Day-type detector: time-of-day behavior split weekday vs weekend.
//!
//! Emits only when one split bucket is meaningfully more consistent than the
//! blended signal, so the plain time-of-day detector stays authoritative for
//! uniform behavior.

use homesense_core::{DayClass, DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::window::{EventWindow, HourCluster, day_class};

/// Bucket consistency floor.
const MIN_BAND_FRACTION: f64 = 0.6;
/// The bucket must beat the blended band fraction by at least this margin.
const MIN_SPLIT_GAIN: f64 = 0.1;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    let mut candidates = Vec::new();

    for ((device, state), occurrences) in window.state_entries() {
        let Some(blended) = HourCluster::from_occurrences(&occurrences) else {
            continue;
        };

        for class in [DayClass::Weekday, DayClass::Weekend] {
            let bucket: Vec<_> = occurrences
                .iter()
                .copied()
                .filter(|ts| day_class(*ts) == class)
                .collect();
            if (bucket.len() as u32) < config.min_support {
                continue;
            }
            let Some(cluster) = HourCluster::from_occurrences(&bucket) else {
                continue;
            };
            if cluster.band_fraction < MIN_BAND_FRACTION
                || cluster.band_fraction < blended.band_fraction + MIN_SPLIT_GAIN
            {
                continue;
            }
            candidates.push(PatternCandidate::new(
                PatternKind::DayType,
                vec![device.clone()],
                cluster.weighted_confidence(),
                bucket,
                PatternMeta::DayType {
                    day_class: class,
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
    use chrono::{Datelike, TimeZone, Utc, Weekday};
    use homesense_core::Event;

    /// Coffee maker: 6:30 on weekdays, 9:30 on weekends.
    fn split_schedule() -> Vec<Event> {
        let mut events = Vec::new();
        for day in 1..=28 {
            let date = Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap();
            let hour = match date.weekday() {
                Weekday::Sat | Weekday::Sun => 9,
                _ => 6,
            };
            let ts = Utc.with_ymd_and_hms(2026, 1, day, hour, 30, 0).unwrap();
            events.push(
                Event::new("switch.coffee", "coffee_maker", "on", ts).with_previous_state("off"),
            );
        }
        events
    }

    #[test]
    fn test_split_schedule_yields_both_buckets() {
        let window = EventWindow::new(split_schedule());
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();

        let weekday = candidates.iter().find(|c| {
            matches!(&c.meta, PatternMeta::DayType { day_class, .. } if *day_class == DayClass::Weekday)
        });
        let weekend = candidates.iter().find(|c| {
            matches!(&c.meta, PatternMeta::DayType { day_class, .. } if *day_class == DayClass::Weekend)
        });
        let weekday = weekday.expect("weekday bucket");
        let weekend = weekend.expect("weekend bucket");

        match (&weekday.meta, &weekend.meta) {
            (
                PatternMeta::DayType { hour: wd_hour, .. },
                PatternMeta::DayType { hour: we_hour, .. },
            ) => {
                assert_eq!(*wd_hour, 6);
                assert_eq!(*we_hour, 9);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_uniform_schedule_yields_nothing() {
        // Same hour every day: the split cannot beat the blended signal.
        let mut events = Vec::new();
        for day in 1..=28 {
            let ts = Utc.with_ymd_and_hms(2026, 1, day, 7, 30, 0).unwrap();
            events.push(
                Event::new("switch.coffee", "coffee_maker", "on", ts).with_previous_state("off"),
            );
        }
        let window = EventWindow::new(events);
        let candidates = detect(&window, &DetectorConfig::default()).unwrap();
        assert!(candidates.is_empty());
    }
}
