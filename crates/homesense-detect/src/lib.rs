//! Pattern detector pipeline for the HomeSense mining engine.
//!
//! Ten independent detectors consume a bounded window of historical device
//! events and emit pattern candidates. Detectors are pure functions behind a
//! closed [`Detector`] enum; one detector's failure never aborts the others.
//! The [`merge::PatternMerger`] collapses candidates into persisted patterns
//! with accumulated statistics.

pub mod candidate;
pub mod detectors;
pub mod merge;
pub mod window;

pub use candidate::PatternCandidate;
pub use detectors::{Detector, DetectorFailure, PipelineOutcome, run_all};
pub use merge::{MergeOutcome, PatternMerger};
pub use window::{EventWindow, HourCluster};
