//! Quality scoring for mined patterns and synergies.
//!
//! Three cooperating pieces:
//! - [`EnsembleScorer`] combines base confidence, recency decay, feedback
//!   history and supporting evidence into one ranking score.
//! - [`DriftDetector`] flags targets whose recent behavior no longer
//!   matches the rate they were mined at, and down-weights them.
//! - [`Calibrator`] nudges the ensemble weights toward whatever components
//!   actually predicted user acceptance, with bounded per-cycle movement.

pub mod calibration;
pub mod drift;
pub mod ensemble;

pub use calibration::{CalibrationState, Calibrator, Observation};
pub use drift::{DriftDetector, DriftStatus};
pub use ensemble::{EnsembleScorer, EnsembleWeights, ScoreComponents};
