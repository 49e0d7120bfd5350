//! Pattern and synergy repository.
//!
//! One redb database holds the mined patterns, discovered synergies,
//! append-only feedback log and calibration state. A mining run commits
//! its results through a single write transaction, so readers either see
//! the previous batch or the new one, never a mix.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use redb::{Database, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use homesense_core::{FeedbackRecord, Pattern, PatternKind, Synergy, SynergyKind, TargetKind};

use crate::Result;

// Patterns table: key = pattern_id, value = Pattern as JSON
const PATTERNS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("patterns");

// Synergies table: key = synergy_id, value = Synergy as JSON
const SYNERGIES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("synergies");

// Feedback log: key = (target_id, timestamp_micros, seq), value = record as JSON
// Append-only; nothing ever updates or removes entries.
const FEEDBACK_TABLE: TableDefinition<(&str, i64, u64), &str> =
    TableDefinition::new("feedback");

// Engine state: key = state name, value = JSON blob
const STATE_TABLE: TableDefinition<&str, &str> = TableDefinition::new("engine_state");

/// State-table key for the calibration blob.
pub const CALIBRATION_STATE_KEY: &str = "calibration";

/// Query over stored patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternQuery {
    pub kind: Option<PatternKind>,
    pub device_id: Option<String>,
    pub min_confidence: f64,
    pub limit: Option<usize>,
}

impl PatternQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: PatternKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, pattern: &Pattern) -> bool {
        if let Some(kind) = self.kind {
            if pattern.kind != kind {
                return false;
            }
        }
        if let Some(device) = &self.device_id {
            if !pattern.involves(device) {
                return false;
            }
        }
        pattern.confidence >= self.min_confidence
    }

    /// Cache key for this query shape.
    pub fn cache_key(&self) -> String {
        format!(
            "p:{}:{}:{:.3}:{}",
            self.kind.map(|k| k.slug()).unwrap_or("*"),
            self.device_id.as_deref().unwrap_or("*"),
            self.min_confidence,
            self.limit.map(|l| l.to_string()).unwrap_or_default(),
        )
    }
}

/// Query over stored synergies.
#[derive(Debug, Clone, Default)]
pub struct SynergyQuery {
    pub kind: Option<SynergyKind>,
    pub device_id: Option<String>,
    pub min_confidence: f64,
    pub validated_only: bool,
    pub limit: Option<usize>,
}

impl SynergyQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: SynergyKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn validated_only(mut self) -> Self {
        self.validated_only = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, synergy: &Synergy) -> bool {
        if let Some(kind) = self.kind {
            if synergy.kind != kind {
                return false;
            }
        }
        if let Some(device) = &self.device_id {
            if !synergy.involves(device) {
                return false;
            }
        }
        if self.validated_only && !synergy.validated_by_patterns {
            return false;
        }
        synergy.confidence >= self.min_confidence
    }

    /// Cache key for this query shape.
    pub fn cache_key(&self) -> String {
        format!(
            "s:{}:{}:{:.3}:{}:{}",
            self.kind.map(|k| k.slug()).unwrap_or("*"),
            self.device_id.as_deref().unwrap_or("*"),
            self.min_confidence,
            self.validated_only,
            self.limit.map(|l| l.to_string()).unwrap_or_default(),
        )
    }
}

/// Persistent repository for mining results.
pub struct MiningRepository {
    db: Arc<Database>,
    feedback_seq: AtomicU64,
}

impl MiningRepository {
    /// Open (or create) the repository under the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = Database::create(path.join("mining.redb"))?;

        let write_txn = db.begin_write()?;
        let next_seq = {
            write_txn.open_table(PATTERNS_TABLE)?;
            write_txn.open_table(SYNERGIES_TABLE)?;
            write_txn.open_table(STATE_TABLE)?;
            let feedback = write_txn.open_table(FEEDBACK_TABLE)?;
            // Keys sort by target id first, so the resumed seq must clear
            // every stored key, not just the last one in key order.
            let mut next = 0u64;
            for entry in feedback.iter()? {
                let (key, _) = entry?;
                next = next.max(key.value().2 + 1);
            }
            next
        };
        write_txn.commit()?;

        info!(path = %path.display(), "mining repository opened");
        Ok(Self {
            db: Arc::new(db),
            feedback_seq: AtomicU64::new(next_seq),
        })
    }

    /// Commit one mining run's results atomically. Existing patterns and
    /// synergies not in the batch are left in place; staleness surfaces as
    /// drift, never as deletion.
    pub fn commit_run(&self, patterns: &[Pattern], synergies: &[Synergy]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PATTERNS_TABLE)?;
            for pattern in patterns {
                let json = serde_json::to_string(pattern)?;
                table.insert(pattern.pattern_id.as_str(), json.as_str())?;
            }
        }
        {
            let mut table = write_txn.open_table(SYNERGIES_TABLE)?;
            for synergy in synergies {
                let json = serde_json::to_string(synergy)?;
                table.insert(synergy.synergy_id.as_str(), json.as_str())?;
            }
        }
        write_txn.commit()?;
        info!(
            patterns = patterns.len(),
            synergies = synergies.len(),
            "mining run committed"
        );
        Ok(())
    }

    pub fn get_pattern(&self, pattern_id: &str) -> Result<Option<Pattern>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PATTERNS_TABLE)?;
        match table.get(pattern_id)? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }

    /// Patterns matching the query, best confidence first.
    pub fn patterns(&self, query: &PatternQuery) -> Result<Vec<Pattern>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PATTERNS_TABLE)?;

        let mut patterns = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let pattern: Pattern = serde_json::from_str(value.value())?;
            if query.matches(&pattern) {
                patterns.push(pattern);
            }
        }
        patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        if let Some(limit) = query.limit {
            patterns.truncate(limit);
        }
        debug!(count = patterns.len(), "pattern query complete");
        Ok(patterns)
    }

    pub fn get_synergy(&self, synergy_id: &str) -> Result<Option<Synergy>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SYNERGIES_TABLE)?;
        match table.get(synergy_id)? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }

    /// Synergies matching the query, best impact first.
    pub fn synergies(&self, query: &SynergyQuery) -> Result<Vec<Synergy>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SYNERGIES_TABLE)?;

        let mut synergies = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let synergy: Synergy = serde_json::from_str(value.value())?;
            if query.matches(&synergy) {
                synergies.push(synergy);
            }
        }
        synergies.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
        if let Some(limit) = query.limit {
            synergies.truncate(limit);
        }
        Ok(synergies)
    }

    /// Append one feedback record to the log.
    pub fn append_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FEEDBACK_TABLE)?;
            let key = (
                record.target_id.as_str(),
                record.timestamp.timestamp_micros(),
                self.feedback_seq.fetch_add(1, Ordering::Relaxed),
            );
            let json = serde_json::to_string(record)?;
            table.insert(key, json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All feedback for one target, oldest first.
    pub fn feedback_for(&self, target_id: &str) -> Result<Vec<FeedbackRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FEEDBACK_TABLE)?;

        let start = (target_id, i64::MIN, u64::MIN);
        let end = (target_id, i64::MAX, u64::MAX);
        let mut records = Vec::new();
        for entry in table.range(start..=end)? {
            let (_, value) = entry?;
            records.push(serde_json::from_str(value.value())?);
        }
        Ok(records)
    }

    /// The complete feedback log, for calibration. Records for targets of
    /// one kind can be filtered by the caller.
    pub fn all_feedback(&self, target: Option<TargetKind>) -> Result<Vec<FeedbackRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FEEDBACK_TABLE)?;

        let mut records: Vec<FeedbackRecord> = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: FeedbackRecord = serde_json::from_str(value.value())?;
            if target.is_none() || target == Some(record.target) {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    /// Persist a named state blob, e.g. the calibration state.
    pub fn save_state<T: Serialize>(&self, key: &str, state: &T) -> Result<()> {
        let json = serde_json::to_string(state)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(STATE_TABLE)?;
            table.insert(key, json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a named state blob.
    pub fn load_state<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STATE_TABLE)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use homesense_core::{PatternMeta, TimeWindowStats};

    fn sample_pattern(device: &str, confidence: f64) -> Pattern {
        let occurrences: Vec<_> = (1..=5)
            .map(|d| Utc.with_ymd_and_hms(2026, 2, d, 19, 0, 0).unwrap())
            .collect();
        Pattern::new(
            PatternKind::TimeOfDay,
            vec![device.to_string()],
            confidence,
            5,
            TimeWindowStats::from_occurrences(&occurrences).unwrap(),
            PatternMeta::TimeOfDay {
                state: "on".into(),
                hour: 19,
                band_fraction: 0.8,
                extra: serde_json::Value::Null,
            },
        )
    }

    #[test]
    fn test_commit_and_query_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MiningRepository::open(dir.path()).unwrap();

        repo.commit_run(
            &[sample_pattern("light_desk", 0.9), sample_pattern("light_hall", 0.4)],
            &[],
        )
        .unwrap();

        let all = repo.patterns(&PatternQuery::new()).unwrap();
        assert_eq!(all.len(), 2);
        // Best confidence first.
        assert_eq!(all[0].devices, vec!["light_desk".to_string()]);

        let confident = repo
            .patterns(&PatternQuery::new().with_min_confidence(0.5))
            .unwrap();
        assert_eq!(confident.len(), 1);

        let by_device = repo
            .patterns(&PatternQuery::new().with_device("light_hall"))
            .unwrap();
        assert_eq!(by_device.len(), 1);
    }

    #[test]
    fn test_recommit_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MiningRepository::open(dir.path()).unwrap();

        let first = sample_pattern("light_desk", 0.5);
        repo.commit_run(std::slice::from_ref(&first), &[]).unwrap();
        let second = sample_pattern("light_desk", 0.8);
        repo.commit_run(std::slice::from_ref(&second), &[]).unwrap();

        let all = repo.patterns(&PatternQuery::new()).unwrap();
        assert_eq!(all.len(), 1, "same stable id updates in place");
        assert_eq!(all[0].confidence, 0.8);
    }

    #[test]
    fn test_feedback_log_is_append_only_per_target() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MiningRepository::open(dir.path()).unwrap();

        for accepted in [true, false, true] {
            let record =
                FeedbackRecord::new("time_of_day:light_desk", TargetKind::Pattern, accepted, None)
                    .unwrap();
            repo.append_feedback(&record).unwrap();
        }

        let records = repo.feedback_for("time_of_day:light_desk").unwrap();
        assert_eq!(records.len(), 3);
        assert!(repo.feedback_for("other").unwrap().is_empty());
    }

    #[test]
    fn test_feedback_seq_resumes_past_max_across_targets() {
        let dir = tempfile::tempdir().unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
        let record_for = |target: &str, accepted| {
            let mut record = FeedbackRecord::new(target, TargetKind::Pattern, accepted, None)
                .unwrap();
            record.timestamp = ts;
            record
        };

        {
            let repo = MiningRepository::open(dir.path()).unwrap();
            // "z_target" sorts last but carries the lowest seq.
            repo.append_feedback(&record_for("z_target", true)).unwrap();
            repo.append_feedback(&record_for("a_target", false)).unwrap();
            repo.append_feedback(&record_for("a_target", false)).unwrap();
        }

        let repo = MiningRepository::open(dir.path()).unwrap();
        // Same target and timestamp as an existing row; the resumed seq
        // must not collide with it.
        repo.append_feedback(&record_for("a_target", true)).unwrap();

        assert_eq!(repo.feedback_for("a_target").unwrap().len(), 3);
        assert_eq!(repo.feedback_for("z_target").unwrap().len(), 1);
    }

    #[test]
    fn test_state_blob_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MiningRepository::open(dir.path()).unwrap();

        assert!(repo
            .load_state::<serde_json::Value>(CALIBRATION_STATE_KEY)
            .unwrap()
            .is_none());

        let state = serde_json::json!({"version": 3});
        repo.save_state(CALIBRATION_STATE_KEY, &state).unwrap();
        let loaded: serde_json::Value = repo
            .load_state(CALIBRATION_STATE_KEY)
            .unwrap()
            .expect("state present");
        assert_eq!(loaded["version"], 3);
    }
}
