//! The batch mining pipeline.
//!
//! One run is a strict sequence: load the historical window, run every
//! detector in parallel, merge candidates into the persisted patterns,
//! assess drift, discover synergies, calibrate scoring weights from
//! feedback, then commit everything in one transaction and invalidate the
//! read caches. A storage failure before the commit leaves the previous
//! batch fully intact.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use homesense_core::{
    DetectorConfig, DeviceInfo, EventFilter, MiningConfig, Pattern, PatternKind, Result,
    Synergy, TimeRange,
};
use homesense_detect::{Detector, DetectorFailure, EventWindow, PatternMerger, PipelineOutcome};
use homesense_scoring::{
    CalibrationState, Calibrator, DriftDetector, DriftStatus, EnsembleScorer, Observation,
};
use homesense_storage::{
    CALIBRATION_STATE_KEY, EventStore, MiningRepository, PatternQuery, QueryCache, SynergyQuery,
};
use homesense_synergy::SynergyEngine;

/// Days of the history window treated as "recent" for drift assessment.
const RECENT_WINDOW_DAYS: i64 = 7;

/// Counters from one completed mining run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub events_scanned: usize,
    pub candidates: usize,
    pub detector_failures: Vec<DetectorFailure>,
    pub patterns_total: usize,
    pub patterns_inserted: usize,
    pub patterns_merged: usize,
    pub patterns_drifted: usize,
    pub synergies_total: usize,
    pub calibration_version: u32,
}

/// Executes mining runs against the stores.
pub struct MiningPipeline {
    events: Arc<dyn EventStore>,
    repository: Arc<MiningRepository>,
    cache: Arc<QueryCache>,
    config: MiningConfig,
}

impl MiningPipeline {
    pub fn new(
        events: Arc<dyn EventStore>,
        repository: Arc<MiningRepository>,
        cache: Arc<QueryCache>,
        config: MiningConfig,
    ) -> Self {
        Self {
            events,
            repository,
            cache,
            config,
        }
    }

    /// Execute one full mining run. Callers must hold the run lock.
    pub async fn run_once(&self, devices: &[DeviceInfo]) -> Result<RunSummary> {
        let range = TimeRange::last_days(self.config.scheduler.history_window_days);
        let events = self.events.query(&range, &EventFilter::default())?;
        let events_scanned = events.len();
        info!(events = events_scanned, "mining run started");

        let window = Arc::new(EventWindow::new(events));
        let outcome = self.run_detectors(window).await;
        let candidates = outcome.candidates.len();

        // Recent evidence per stable pattern id, for drift assessment.
        let recent_start = range.end - Duration::days(RECENT_WINDOW_DAYS);
        let mut recent_counts: HashMap<String, u32> = HashMap::new();
        for candidate in &outcome.candidates {
            let recent = candidate
                .occurrences
                .iter()
                .filter(|ts| **ts >= recent_start)
                .count() as u32;
            *recent_counts.entry(candidate.pattern_id()).or_default() += recent;
        }

        let existing = self.repository.patterns(&PatternQuery::new())?;
        let merge = PatternMerger::new().merge_run(existing, outcome.candidates);
        let mut patterns = merge.patterns;

        let drift = DriftDetector::new(&self.config.scoring);
        let mut patterns_drifted = 0;
        for pattern in &mut patterns {
            let recent = recent_counts.get(&pattern.pattern_id).copied().unwrap_or(0);
            let status = drift.assess_pattern(pattern, recent, RECENT_WINDOW_DAYS as f64);
            pattern.drifted = status == DriftStatus::Drifted;
            if pattern.drifted {
                patterns_drifted += 1;
            }
        }

        let synergies = SynergyEngine::new(self.config.synergy.clone())
            .discover(devices, &patterns)?;

        let calibration_version = self.calibrate(&patterns, &synergies)?;

        // One transaction: readers see the old batch or the new one.
        self.repository.commit_run(&patterns, &synergies)?;
        self.cache.invalidate_all();

        // History is owned by the feed and kept by default; retention is
        // opt-in and never cuts into the seasonal detection span.
        if let Some(days) = self.config.scheduler.retention_days {
            let keep = days.max(self.config.detector.seasonal_min_span_days.ceil() as i64);
            if let Err(e) = self.events.prune_before(range.end - Duration::days(keep)) {
                // Advisory; the committed batch is already durable.
                warn!(error = %e, "event retention prune failed");
            }
        }

        let summary = RunSummary {
            events_scanned,
            candidates,
            detector_failures: outcome.failures,
            patterns_total: patterns.len(),
            patterns_inserted: merge.inserted,
            patterns_merged: merge.merged,
            patterns_drifted,
            synergies_total: synergies.len(),
            calibration_version,
        };
        info!(
            patterns = summary.patterns_total,
            synergies = summary.synergies_total,
            drifted = summary.patterns_drifted,
            "mining run committed"
        );
        Ok(summary)
    }

    /// Run every detector kind on its own blocking task; a failing or
    /// panicking detector is reported and skipped.
    async fn run_detectors(&self, window: Arc<EventWindow>) -> PipelineOutcome {
        let config = Arc::new(self.config.detector.clone());
        let kinds = PatternKind::all();
        let tasks: Vec<_> = kinds
            .iter()
            .map(|&kind| {
                let window = Arc::clone(&window);
                let config: Arc<DetectorConfig> = Arc::clone(&config);
                tokio::task::spawn_blocking(move || Detector(kind).run(&window, &config))
            })
            .collect();
        let results = futures::future::join_all(tasks).await;

        let mut outcome = PipelineOutcome::default();
        for (kind, result) in kinds.into_iter().zip(results) {
            match result {
                Ok(Ok(candidates)) => outcome.candidates.extend(candidates),
                Ok(Err(e)) => {
                    warn!(detector = kind.slug(), error = %e, "detector failed, skipping");
                    outcome.failures.push(DetectorFailure {
                        kind,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(detector = kind.slug(), error = %e, "detector task panicked, skipping");
                    outcome.failures.push(DetectorFailure {
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }
        outcome
    }

    /// Replay the feedback log against current score components and nudge
    /// the ensemble weights. Returns the resulting weight version.
    fn calibrate(&self, patterns: &[Pattern], synergies: &[Synergy]) -> Result<u32> {
        let mut state: CalibrationState = self
            .repository
            .load_state(CALIBRATION_STATE_KEY)?
            .unwrap_or_default();
        let scorer =
            EnsembleScorer::new(&self.config.scoring).with_weights(state.weights.clone());
        let now = Utc::now();

        let mut observations = Vec::new();
        for pattern in patterns {
            let records = self.repository.feedback_for(&pattern.pattern_id)?;
            if records.is_empty() {
                continue;
            }
            let components = scorer.pattern_components(pattern, &records, now);
            observations.extend(records.iter().map(|r| Observation {
                components,
                acceptance: r.acceptance_score(),
            }));
        }
        for synergy in synergies {
            let records = self.repository.feedback_for(&synergy.synergy_id)?;
            if records.is_empty() {
                continue;
            }
            let components = scorer.synergy_components(synergy, &records, now);
            observations.extend(records.iter().map(|r| Observation {
                components,
                acceptance: r.acceptance_score(),
            }));
        }

        Calibrator::new(&self.config.scoring).calibrate(&mut state, &observations);
        self.repository.save_state(CALIBRATION_STATE_KEY, &state)?;
        Ok(state.weights.version)
    }

    /// Current pattern count, for diagnostics.
    pub fn stored_pattern_count(&self) -> Result<usize> {
        Ok(self.repository.patterns(&PatternQuery::new())?.len())
    }

    /// Current synergy count, for diagnostics.
    pub fn stored_synergy_count(&self) -> Result<usize> {
        Ok(self.repository.synergies(&SynergyQuery::new())?.len())
    }
}
