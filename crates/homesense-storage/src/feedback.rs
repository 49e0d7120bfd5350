//! Feedback sink.
//!
//! The only write path for user feedback. Records are validated against
//! the repository (the target must exist) and then appended to the log;
//! nothing in the engine ever mutates or deletes them.

use std::sync::Arc;

use tracing::info;

use homesense_core::{FeedbackRecord, TargetKind};

use crate::repository::MiningRepository;
use crate::{Error, Result};

/// Append-only feedback intake.
pub struct FeedbackSink {
    repository: Arc<MiningRepository>,
}

impl FeedbackSink {
    pub fn new(repository: Arc<MiningRepository>) -> Self {
        Self { repository }
    }

    /// Validate and append one feedback record.
    pub fn submit(&self, record: FeedbackRecord) -> Result<()> {
        let exists = match record.target {
            TargetKind::Pattern => self.repository.get_pattern(&record.target_id)?.is_some(),
            TargetKind::Synergy => self.repository.get_synergy(&record.target_id)?.is_some(),
        };
        if !exists {
            return Err(Error::NotFound(format!(
                "{} '{}'",
                record.target.slug(),
                record.target_id
            )));
        }
        self.repository.append_feedback(&record)?;
        info!(
            target = record.target.slug(),
            target_id = %record.target_id,
            accepted = record.accepted,
            "feedback recorded"
        );
        Ok(())
    }
}
