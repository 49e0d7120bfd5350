//! Session detector: recurring device sets within inactivity-gap sessions.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use homesense_core::{DetectorConfig, PatternKind, PatternMeta, Result};

use crate::candidate::PatternCandidate;
use crate::window::EventWindow;

/// Minimum fraction of sessions a set must recur in.
const MIN_RECURRENCE: f64 = 0.25;
/// Sessions with more distinct devices than this are too busy to enumerate.
const MAX_SESSION_DEVICES: usize = 8;

pub(super) fn detect(
    window: &EventWindow,
    config: &DetectorConfig,
) -> Result<Vec<PatternCandidate>> {
    let sessions = window.sessions(config.session_gap_secs);
    let session_count = sessions.len() as u32;
    if session_count == 0 {
        return Ok(Vec::new());
    }

    // Count device pairs (and triples when the session is small enough)
    // appearing together in a session, keyed by the sorted device set.
    let mut set_occurrences: HashMap<Vec<String>, Vec<DateTime<Utc>>> = HashMap::new();
    for session in &sessions {
        let devices: BTreeSet<&str> = session
            .iter()
            .filter(|e| e.is_transition())
            .map(|e| e.device_id.as_str())
            .collect();
        if devices.len() < 2 || devices.len() > MAX_SESSION_DEVICES {
            continue;
        }
        let devices: Vec<&str> = devices.into_iter().collect();
        let started_at = session[0].timestamp;

        for i in 0..devices.len() {
            for j in i + 1..devices.len() {
                set_occurrences
                    .entry(vec![devices[i].to_string(), devices[j].to_string()])
                    .or_default()
                    .push(started_at);
                if devices.len() <= 5 {
                    for device in devices.iter().skip(j + 1) {
                        set_occurrences
                            .entry(vec![
                                devices[i].to_string(),
                                devices[j].to_string(),
                                device.to_string(),
                            ])
                            .or_default()
                            .push(started_at);
                    }
                }
            }
        }
    }

    let mut candidates = Vec::new();
    for (devices, occurrences) in set_occurrences {
        let occurred = occurrences.len() as u32;
        if occurred < config.min_support {
            continue;
        }
        let recurrence = occurred as f64 / session_count as f64;
        if recurrence < MIN_RECURRENCE {
            continue;
        }
        candidates.push(PatternCandidate::new(
            PatternKind::Session,
            devices,
            recurrence.min(1.0),
            occurrences,
            PatternMeta::Session {
                gap_secs: config.session_gap_secs,
                set_occurrences: occurred,
                session_count,
                extra: serde_json::Value::Null,
            },
        ));
    }

    Ok(candidates)
}
