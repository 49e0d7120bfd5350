//! Mining job lifecycle and the single-run lock.
//!
//! At most one mining run executes at a time. [`MiningJobState::try_begin`]
//! hands out a token while recording the job; a token dropped without an
//! explicit outcome releases the lock and marks the job failed, so a
//! panicking run can never wedge the scheduler.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use homesense_core::{Error, Result};

/// Lifecycle state of one mining job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

/// One mining job's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Run lock plus job history.
#[derive(Default)]
pub struct MiningJobState {
    active: Mutex<Option<Uuid>>,
    jobs: DashMap<Uuid, JobRecord>,
}

impl MiningJobState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the run lock. Fails immediately when a run is in flight;
    /// callers never queue behind one.
    pub fn try_begin(&self) -> Result<RunToken<'_>> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(Error::JobAlreadyRunning);
        }
        let job_id = Uuid::new_v4();
        *active = Some(job_id);
        self.jobs.insert(
            job_id,
            JobRecord {
                job_id,
                state: JobState::Running,
                started_at: Utc::now(),
                completed_at: None,
                error: None,
            },
        );
        Ok(RunToken {
            state: self,
            job_id,
            finished: false,
        })
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn status(&self, job_id: &Uuid) -> Option<JobRecord> {
        self.jobs.get(job_id).map(|r| r.clone())
    }

    /// Most recent job record, running or finished.
    pub fn latest(&self) -> Option<JobRecord> {
        self.jobs
            .iter()
            .max_by_key(|r| r.started_at)
            .map(|r| r.clone())
    }

    fn finish(&self, job_id: Uuid, state: JobState, error: Option<String>) {
        if let Some(mut record) = self.jobs.get_mut(&job_id) {
            record.state = state;
            record.completed_at = Some(Utc::now());
            record.error = error;
        }
        let mut active = self.active.lock();
        if *active == Some(job_id) {
            *active = None;
        }
    }
}

/// Held while one mining run executes.
pub struct RunToken<'a> {
    state: &'a MiningJobState,
    job_id: Uuid,
    finished: bool,
}

impl RunToken<'_> {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Mark the run completed and release the lock.
    pub fn complete(mut self) {
        self.finished = true;
        self.state.finish(self.job_id, JobState::Completed, None);
    }

    /// Mark the run failed and release the lock.
    pub fn fail(mut self, message: impl Into<String>) {
        self.finished = true;
        self.state
            .finish(self.job_id, JobState::Failed, Some(message.into()));
    }
}

impl Drop for RunToken<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.finish(
                self.job_id,
                JobState::Failed,
                Some("run aborted without an outcome".into()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_fails_while_running() {
        let state = MiningJobState::new();
        let token = state.try_begin().unwrap();
        assert!(matches!(state.try_begin(), Err(Error::JobAlreadyRunning)));
        token.complete();
        assert!(state.try_begin().is_ok());
    }

    #[test]
    fn test_completion_is_recorded() {
        let state = MiningJobState::new();
        let token = state.try_begin().unwrap();
        let job_id = token.job_id();
        assert_eq!(state.status(&job_id).unwrap().state, JobState::Running);

        token.complete();
        let record = state.status(&job_id).unwrap();
        assert_eq!(record.state, JobState::Completed);
        assert!(record.completed_at.is_some());
        assert!(!state.is_running());
    }

    #[test]
    fn test_failure_keeps_the_message() {
        let state = MiningJobState::new();
        let token = state.try_begin().unwrap();
        let job_id = token.job_id();
        token.fail("event store unavailable");

        let record = state.status(&job_id).unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.error.as_deref(), Some("event store unavailable"));
        assert!(!state.is_running());
    }

    #[test]
    fn test_dropped_token_releases_the_lock() {
        let state = MiningJobState::new();
        let job_id = {
            let token = state.try_begin().unwrap();
            token.job_id()
            // dropped without an outcome
        };
        assert!(!state.is_running());
        assert_eq!(state.status(&job_id).unwrap().state, JobState::Failed);
        assert!(state.try_begin().is_ok());
    }
}
