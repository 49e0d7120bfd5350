//! Ordered device-pair accumulation shared by the co-occurrence family.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use homesense_core::Event;

use crate::window::EventWindow;

/// Accumulated statistics for one ordered `(trigger, target)` pair.
#[derive(Debug, Default, Clone)]
pub(crate) struct PairAccum {
    /// Trigger occurrences followed by the target within the window.
    /// At most one per trigger occurrence.
    pub pair_count: u32,
    /// Trigger-to-target lags, seconds.
    pub lags_secs: Vec<i64>,
    /// Timestamps of the matched trigger occurrences.
    pub occurrences: Vec<DateTime<Utc>>,
    /// Indices of matched trigger events into the transitions slice.
    pub matched_trigger_idx: Vec<usize>,
}

impl PairAccum {
    pub fn median_lag_secs(&self) -> i64 {
        if self.lags_secs.is_empty() {
            return 0;
        }
        let mut sorted = self.lags_secs.clone();
        sorted.sort();
        sorted[sorted.len() / 2]
    }
}

/// Pair statistics over one window.
pub(crate) struct PairScan<'a> {
    /// All transitions, time order.
    pub transitions: Vec<&'a Event>,
    /// Per-device trigger counts.
    pub trigger_counts: HashMap<String, u32>,
    /// Ordered pair accumulators keyed by `(trigger, target)` device ids.
    pub pairs: HashMap<(String, String), PairAccum>,
}

impl PairScan<'_> {
    /// Conditional probability P(target follows | trigger fired).
    pub fn confidence(&self, trigger: &str, accum: &PairAccum) -> f64 {
        let trigger_count = self.trigger_counts.get(trigger).copied().unwrap_or(0);
        if trigger_count == 0 {
            return 0.0;
        }
        accum.pair_count as f64 / trigger_count as f64
    }
}

/// Scan the window for ordered pairs: for each trigger transition, each
/// distinct other device transitioning within `window_secs` afterwards
/// counts once.
pub(crate) fn scan_pairs(window: &EventWindow, window_secs: i64) -> PairScan<'_> {
    let transitions: Vec<&Event> = window.transitions().collect();
    let mut trigger_counts: HashMap<String, u32> = HashMap::new();
    let mut pairs: HashMap<(String, String), PairAccum> = HashMap::new();

    for event in &transitions {
        *trigger_counts.entry(event.device_id.clone()).or_insert(0) += 1;
    }

    for (i, trigger) in transitions.iter().enumerate() {
        let deadline = trigger.timestamp + chrono::Duration::seconds(window_secs);
        let mut seen_targets: Vec<&str> = Vec::new();
        for target in transitions.iter().skip(i + 1) {
            if target.timestamp > deadline {
                break;
            }
            if target.device_id == trigger.device_id {
                continue;
            }
            if seen_targets.contains(&target.device_id.as_str()) {
                continue;
            }
            seen_targets.push(&target.device_id);
            let accum = pairs
                .entry((trigger.device_id.clone(), target.device_id.clone()))
                .or_default();
            accum.pair_count += 1;
            accum
                .lags_secs
                .push((target.timestamp - trigger.timestamp).num_seconds());
            accum.occurrences.push(trigger.timestamp);
            accum.matched_trigger_idx.push(i);
        }
    }

    PairScan {
        transitions,
        trigger_counts,
        pairs,
    }
}
