//! User feedback on patterns and synergies.
//!
//! Feedback records are append-only: the sink only ever adds them, and the
//! calibration loop only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What a feedback record targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Pattern,
    Synergy,
}

impl TargetKind {
    pub fn slug(&self) -> &'static str {
        match self {
            TargetKind::Pattern => "pattern",
            TargetKind::Synergy => "synergy",
        }
    }
}

/// One accept/reject/rating event against a pattern or synergy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub target_id: String,
    pub target: TargetKind,
    pub accepted: bool,
    /// Optional 1-5 star rating.
    pub rating: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Create a record, validating the rating range.
    pub fn new(
        target_id: impl Into<String>,
        target: TargetKind,
        accepted: bool,
        rating: Option<u8>,
    ) -> Result<Self> {
        if let Some(r) = rating {
            if !(1..=5).contains(&r) {
                return Err(Error::Validation(format!("rating {r} outside 1..=5")));
            }
        }
        Ok(Self {
            target_id: target_id.into(),
            target,
            accepted,
            rating,
            timestamp: Utc::now(),
        })
    }

    /// Acceptance expressed as a score in [0,1]. A rating refines the
    /// binary signal when present.
    pub fn acceptance_score(&self) -> f64 {
        match self.rating {
            Some(r) => (r - 1) as f64 / 4.0,
            None => {
                if self.accepted {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_range_validated() {
        assert!(FeedbackRecord::new("p1", TargetKind::Pattern, true, Some(0)).is_err());
        assert!(FeedbackRecord::new("p1", TargetKind::Pattern, true, Some(6)).is_err());
        assert!(FeedbackRecord::new("p1", TargetKind::Pattern, true, Some(5)).is_ok());
    }

    #[test]
    fn test_acceptance_score() {
        let accept = FeedbackRecord::new("s1", TargetKind::Synergy, true, None).unwrap();
        assert_eq!(accept.acceptance_score(), 1.0);

        let reject = FeedbackRecord::new("s1", TargetKind::Synergy, false, None).unwrap();
        assert_eq!(reject.acceptance_score(), 0.0);

        let rated = FeedbackRecord::new("s1", TargetKind::Synergy, true, Some(3)).unwrap();
        assert_eq!(rated.acceptance_score(), 0.5);
    }
}
