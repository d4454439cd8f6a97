// ── Analysis job orchestrator ──
//
// Submits analysis jobs, reads status snapshots and results. Owns no
// timers: `poll` hands back a lazy stream and the caller decides the
// cadence. The orchestrator remembers the furthest status it has seen for
// each job so a lagging backend replica can never move a job backwards.

use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_core::Stream;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{AnalysisJob, AnalysisResult, JobStatus};
use crate::normalize;
use crate::session::SessionManager;

/// Lazy stream of status snapshots returned by [`AnalysisOrchestrator::poll`].
pub type JobPoll = Pin<Box<dyn Stream<Item = Result<AnalysisJob, CoreError>> + Send>>;

#[derive(Debug, Clone)]
pub struct AnalysisOrchestrator {
    session: SessionManager,
    /// Furthest status observed per job id.
    observed: Arc<DashMap<String, JobStatus>>,
}

impl AnalysisOrchestrator {
    pub fn new(session: &SessionManager) -> Self {
        Self {
            session: session.clone(),
            observed: Arc::new(DashMap::new()),
        }
    }

    /// Submit a new analysis job.
    pub async fn run_analysis(&self) -> Result<AnalysisJob, CoreError> {
        let raw = self.session.authorized_api()?.run_analysis().await?;
        let job = normalize::job(&raw, Utc::now());

        if job.job_id.is_empty() {
            return Err(CoreError::Api {
                message: "service accepted the analysis but returned no job id".into(),
                status: None,
            });
        }

        info!(job_id = %job.job_id, status = %job.status, "analysis job submitted");
        Ok(self.track(job))
    }

    /// One status snapshot. Never reports a status behind one already seen.
    pub async fn get_status(&self, job_id: &str) -> Result<AnalysisJob, CoreError> {
        let raw = self.session.authorized_api()?.analysis_status(job_id).await?;
        let mut job = normalize::job(&raw, Utc::now());
        if job.job_id.is_empty() {
            job.job_id = job_id.to_owned();
        }

        debug!(job_id, status = %job.status, progress = job.progress, "job status");
        Ok(self.track(job))
    }

    /// Poll `job_id` at most `max_attempts` times.
    ///
    /// Each pull of the stream issues exactly one status request. The stream
    /// ends after a terminal snapshot, after `max_attempts` pulls, or right
    /// after yielding an error. Drop it to stop early.
    pub fn poll(&self, job_id: &str, max_attempts: u32) -> JobPoll {
        let this = self.clone();
        let job_id = job_id.to_owned();

        Box::pin(async_stream::stream! {
            for attempt in 1..=max_attempts {
                match this.get_status(&job_id).await {
                    Ok(job) => {
                        let done = job.status.is_terminal();
                        yield Ok(job);
                        if done {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(job_id = %job_id, attempt, error = %e, "status poll failed");
                        yield Err(e);
                        return;
                    }
                }
            }
            debug!(job_id = %job_id, max_attempts, "poll attempts exhausted");
        })
    }

    /// Normalized results of a job.
    ///
    /// Only meaningful once the job has completed; the service decides what
    /// an early call returns.
    pub async fn get_results(&self, job_id: &str) -> Result<AnalysisResult, CoreError> {
        let raw = self
            .session
            .authorized_api()?
            .analysis_results(job_id)
            .await?;
        let result = normalize::analysis_result(&raw, job_id, Utc::now());
        self.observed.remove(job_id);

        info!(
            job_id,
            health = result.health.overall,
            findings = result.findings.len(),
            "analysis results fetched"
        );
        Ok(result)
    }

    /// Furthest status observed for a job still being tracked.
    pub fn last_status(&self, job_id: &str) -> Option<JobStatus> {
        self.observed.get(job_id).map(|status| *status)
    }

    /// Clamp `job` to the furthest status seen so far and remember it.
    fn track(&self, mut job: AnalysisJob) -> AnalysisJob {
        match self.observed.entry(job.job_id.clone()) {
            Entry::Occupied(mut seen) => {
                let previous = *seen.get();
                if previous.can_transition_to(job.status) {
                    seen.insert(job.status);
                } else {
                    warn!(
                        job_id = %job.job_id,
                        from = %previous,
                        to = %job.status,
                        "ignoring backward job status"
                    );
                    job.status = previous;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(job.status);
            }
        }
        job
    }
}
