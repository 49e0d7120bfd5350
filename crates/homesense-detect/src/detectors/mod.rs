//! The closed set of pattern detectors and the failure-isolating pipeline.

mod anomaly;
mod co_occurrence;
mod contextual;
mod day_type;
mod duration;
mod pairs;
mod room;
mod seasonal;
mod sequence;
mod session;
mod time_of_day;

use homesense_core::{DetectorConfig, PatternKind, Result};
use tracing::{debug, warn};

use crate::candidate::PatternCandidate;
use crate::window::EventWindow;

/// A detector kind bound to its pure detection function.
///
/// The pipeline iterates [`PatternKind::all`]; there is no runtime
/// discovery of detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detector(pub PatternKind);

impl Detector {
    /// Run this detector over the window.
    ///
    /// Candidates below the configured support floors are simply not
    /// emitted; that is data sparsity, not an error.
    pub fn run(
        &self,
        window: &EventWindow,
        config: &DetectorConfig,
    ) -> Result<Vec<PatternCandidate>> {
        match self.0 {
            PatternKind::TimeOfDay => time_of_day::detect(window, config),
            PatternKind::CoOccurrence => co_occurrence::detect(window, config),
            PatternKind::Sequence => sequence::detect(window, config),
            PatternKind::Contextual => contextual::detect(window, config),
            PatternKind::RoomBased => room::detect(window, config),
            PatternKind::Session => session::detect(window, config),
            PatternKind::Duration => duration::detect(window, config),
            PatternKind::DayType => day_type::detect(window, config),
            PatternKind::Seasonal => seasonal::detect(window, config),
            PatternKind::Anomaly => anomaly::detect(window, config),
        }
    }

    pub fn name(&self) -> &'static str {
        self.0.slug()
    }
}

/// A detector that failed during a run. The rest of the pipeline is
/// unaffected.
#[derive(Debug, Clone)]
pub struct DetectorFailure {
    pub kind: PatternKind,
    pub message: String,
}

/// Result of running the full detector pipeline.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub candidates: Vec<PatternCandidate>,
    pub failures: Vec<DetectorFailure>,
}

impl PipelineOutcome {
    /// Candidates emitted by one detector kind.
    pub fn of_kind(&self, kind: PatternKind) -> impl Iterator<Item = &PatternCandidate> {
        self.candidates.iter().filter(move |c| c.kind == kind)
    }
}

/// Run every detector over the window, isolating individual failures.
pub fn run_all(window: &EventWindow, config: &DetectorConfig) -> PipelineOutcome {
    let mut outcome = PipelineOutcome::default();
    for kind in PatternKind::all() {
        let detector = Detector(kind);
        match detector.run(window, config) {
            Ok(candidates) => {
                debug!(
                    detector = detector.name(),
                    count = candidates.len(),
                    "detector completed"
                );
                outcome.candidates.extend(candidates);
            }
            Err(e) => {
                warn!(detector = detector.name(), error = %e, "detector failed, skipping");
                outcome.failures.push(DetectorFailure {
                    kind,
                    message: e.to_string(),
                });
            }
        }
    }
    outcome
}
