//! Scheduled mining runs.
//!
//! One background task triggers a mining run on the configured cadence.
//! Manual triggers share the same run lock as the scheduled task, so a
//! scheduled tick landing during a manual run skips instead of queueing.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use homesense_core::{Error, SchedulerConfig};

use crate::service::AnalysisService;

/// Interval-driven mining scheduler.
pub struct MiningScheduler {
    service: Arc<AnalysisService>,
    interval_secs: u64,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MiningScheduler {
    pub fn new(service: Arc<AnalysisService>, config: &SchedulerConfig) -> Self {
        Self {
            service,
            interval_secs: config.interval_secs.max(1),
            handle: Mutex::new(None),
        }
    }

    /// Start the background task. A second call is a no-op.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return;
        }

        let service = Arc::clone(&self.service);
        let interval_secs = self.interval_secs;
        *handle = Some(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the first run happens
            // one full interval after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match service.trigger_analysis().await {
                    Ok((job_id, summary)) => {
                        info!(
                            %job_id,
                            patterns = summary.patterns_total,
                            synergies = summary.synergies_total,
                            "scheduled mining run finished"
                        );
                    }
                    Err(Error::JobAlreadyRunning) => {
                        debug!("scheduled tick skipped, a run is in flight");
                    }
                    Err(e) => {
                        warn!(error = %e, "scheduled mining run failed");
                    }
                }
            }
        }));
        info!(interval_secs = self.interval_secs, "mining scheduler started");
    }

    /// Stop the background task.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
            info!("mining scheduler stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.handle.lock().is_some()
    }
}

impl Drop for MiningScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
