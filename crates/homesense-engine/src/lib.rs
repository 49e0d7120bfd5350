//! Orchestration layer of the HomeSense mining engine.
//!
//! Wires the detector pipeline, synergy discovery, scoring and storage
//! into a batch mining service: a daily scheduler (plus manual trigger)
//! runs the pipeline under a single-run lock, commits each batch
//! atomically and invalidates the read caches. [`AnalysisService`] is the
//! embedding surface.

pub mod job;
pub mod pipeline;
pub mod scheduler;
pub mod service;

pub use job::{JobRecord, JobState, MiningJobState};
pub use pipeline::{MiningPipeline, RunSummary};
pub use scheduler::MiningScheduler;
pub use service::{AnalysisService, RankedPattern, RankedSynergy};
