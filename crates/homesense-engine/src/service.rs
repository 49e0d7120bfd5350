//! The analysis service facade.
//!
//! Owns the stores, caches, job state and pipeline, and exposes the
//! engine's operations: trigger a mining run, read ranked patterns and
//! synergies, submit feedback and inspect job status. Interactive reads
//! run under the configured deadline and are served from cache when warm.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use homesense_core::{
    DeviceInfo, Event, FeedbackRecord, MiningConfig, Pattern, Result, Synergy,
};
use homesense_scoring::{CalibrationState, DriftDetector, DriftStatus, EnsembleScorer};
use homesense_storage::{
    CALIBRATION_STATE_KEY, EventStore, FeedbackSink, MiningRepository, PatternQuery, QueryCache,
    SynergyQuery,
};

use crate::job::{JobRecord, MiningJobState};
use crate::pipeline::{MiningPipeline, RunSummary};

/// A pattern with its ensemble ranking score.
#[derive(Debug, Clone)]
pub struct RankedPattern {
    pub pattern: Pattern,
    pub score: f64,
}

/// A synergy with its ensemble ranking score.
#[derive(Debug, Clone)]
pub struct RankedSynergy {
    pub synergy: Synergy,
    pub score: f64,
}

/// Entry point for embedding the mining engine.
pub struct AnalysisService {
    events: Arc<dyn EventStore>,
    repository: Arc<MiningRepository>,
    cache: Arc<QueryCache>,
    pipeline: MiningPipeline,
    sink: FeedbackSink,
    jobs: MiningJobState,
    devices: RwLock<Vec<DeviceInfo>>,
    config: MiningConfig,
}

impl AnalysisService {
    pub fn new(
        events: Arc<dyn EventStore>,
        repository: Arc<MiningRepository>,
        config: MiningConfig,
    ) -> Self {
        let cache = Arc::new(QueryCache::new(&config.cache));
        let pipeline = MiningPipeline::new(
            Arc::clone(&events),
            Arc::clone(&repository),
            Arc::clone(&cache),
            config.clone(),
        );
        let sink = FeedbackSink::new(Arc::clone(&repository));
        Self {
            events,
            repository,
            cache,
            pipeline,
            sink,
            jobs: MiningJobState::new(),
            devices: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Replace the device metadata snapshot used by synergy discovery.
    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        *self.devices.write() = devices;
    }

    /// Append events from the feed reader.
    pub fn ingest_events(&self, events: &[Event]) -> Result<()> {
        self.events.append_batch(events)?;
        Ok(())
    }

    /// Run one mining batch now. Fails fast with
    /// [`homesense_core::Error::JobAlreadyRunning`] while another run
    /// holds the lock.
    pub async fn trigger_analysis(&self) -> Result<(Uuid, RunSummary)> {
        let token = self.jobs.try_begin()?;
        let job_id = token.job_id();
        info!(%job_id, "mining run triggered");

        let devices = self.devices.read().clone();
        match self.pipeline.run_once(&devices).await {
            Ok(summary) => {
                token.complete();
                Ok((job_id, summary))
            }
            Err(e) => {
                token.fail(e.to_string());
                Err(e)
            }
        }
    }

    pub fn job_status(&self, job_id: &Uuid) -> Option<JobRecord> {
        self.jobs.status(job_id)
    }

    pub fn latest_job(&self) -> Option<JobRecord> {
        self.jobs.latest()
    }

    /// Ranked patterns under the interactive read deadline. Degrades to
    /// an empty list on deadline overrun or storage failure so callers
    /// can proceed without pattern context.
    pub async fn list_patterns(&self, query: PatternQuery) -> Vec<RankedPattern> {
        let repository = Arc::clone(&self.repository);
        let cache = Arc::clone(&self.cache);
        let scoring = self.config.scoring.clone();

        self.deadline_read(Vec::new(), move || {
            let patterns = cache.patterns(&query, || repository.patterns(&query))?;
            let scorer = load_scorer(&repository, &scoring)?;
            let drift = DriftDetector::new(&scoring);
            let now = Utc::now();

            let mut ranked = Vec::with_capacity(patterns.len());
            for pattern in patterns.iter() {
                let feedback = repository.feedback_for(&pattern.pattern_id)?;
                let status = if pattern.drifted {
                    DriftStatus::Drifted
                } else {
                    DriftStatus::Stable
                };
                let score =
                    drift.rank_score(scorer.score_pattern(pattern, &feedback, now), status);
                ranked.push(RankedPattern {
                    pattern: pattern.clone(),
                    score,
                });
            }
            ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
            Ok(ranked)
        })
        .await
    }

    /// Ranked synergies under the interactive read deadline, degrading
    /// to an empty list like [`Self::list_patterns`].
    pub async fn list_synergies(&self, query: SynergyQuery) -> Vec<RankedSynergy> {
        let repository = Arc::clone(&self.repository);
        let cache = Arc::clone(&self.cache);
        let scoring = self.config.scoring.clone();

        self.deadline_read(Vec::new(), move || {
            let synergies = cache.synergies(&query, || repository.synergies(&query))?;
            let scorer = load_scorer(&repository, &scoring)?;
            let now = Utc::now();

            let mut ranked = Vec::with_capacity(synergies.len());
            for synergy in synergies.iter() {
                let feedback = repository.feedback_for(&synergy.synergy_id)?;
                ranked.push(RankedSynergy {
                    synergy: synergy.clone(),
                    score: scorer.score_synergy(synergy, &feedback, now),
                });
            }
            ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
            Ok(ranked)
        })
        .await
    }

    pub async fn get_pattern(&self, pattern_id: &str) -> Option<Pattern> {
        let repository = Arc::clone(&self.repository);
        let cache = Arc::clone(&self.cache);
        let id = pattern_id.to_string();
        self.deadline_read(None, move || {
            cache.pattern_by_id(&id, || repository.get_pattern(&id))
        })
        .await
    }

    pub async fn get_synergy(&self, synergy_id: &str) -> Option<Synergy> {
        let repository = Arc::clone(&self.repository);
        let id = synergy_id.to_string();
        self.deadline_read(None, move || repository.get_synergy(&id))
            .await
    }

    /// Record user feedback against an existing pattern or synergy.
    pub fn submit_feedback(&self, record: FeedbackRecord) -> Result<()> {
        self.sink.submit(record)?;
        Ok(())
    }

    /// Run a blocking read under the configured deadline. Overruns and
    /// storage failures log a warning and yield the degraded fallback;
    /// reads never propagate errors to the caller.
    async fn deadline_read<T, F>(&self, fallback: T, read: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> homesense_storage::Result<T> + Send + 'static,
    {
        let deadline_ms = self.config.cache.read_deadline_ms;
        let deadline = Duration::from_millis(deadline_ms);
        match tokio::time::timeout(deadline, tokio::task::spawn_blocking(read)).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "interactive read degraded on storage failure");
                fallback
            }
            Ok(Err(join)) => {
                warn!(error = %join, "interactive read task failed");
                fallback
            }
            Err(_) => {
                warn!(deadline_ms, "interactive read degraded on deadline overrun");
                fallback
            }
        }
    }
}

/// Build a scorer with the persisted calibration weights.
fn load_scorer(
    repository: &MiningRepository,
    scoring: &homesense_core::ScoringConfig,
) -> homesense_storage::Result<EnsembleScorer> {
    let state: CalibrationState = repository
        .load_state(CALIBRATION_STATE_KEY)?
        .unwrap_or_default();
    Ok(EnsembleScorer::new(scoring).with_weights(state.weights))
}
