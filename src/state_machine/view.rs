use serde::Serialize;

use super::job::{Job, JobId, LifecycleState};
use super::stage::COMPLETE_RANK;
use crate::report::ResultBundle;

/// Snapshot of the controller handed to the presentation layer.
///
/// `message` is the single user-facing message slot: filled by any failure,
/// cleared by a new submission or a reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobView {
    pub job_id: Option<JobId>,
    pub lifecycle: Option<LifecycleState>,
    pub message: Option<String>,
}

impl JobView {
    /// No job and no message.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn submission_failed(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: Some(job.id.clone()),
            lifecycle: Some(job.state.clone()),
            message: job.state.error_detail().map(|d| d.message.clone()),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.job_id.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.lifecycle.as_ref().is_some_and(LifecycleState::is_terminal)
    }

    pub fn label(&self) -> &str {
        self.lifecycle.as_ref().map_or("", LifecycleState::label)
    }

    pub fn result(&self) -> Option<&ResultBundle> {
        self.lifecycle.as_ref().and_then(LifecycleState::result)
    }

    /// Completed steps out of the pipeline length, for progress bars.
    /// Unknown stages and failures report no progress.
    pub fn progress(&self) -> Option<(u8, u8)> {
        self.lifecycle
            .as_ref()
            .and_then(LifecycleState::rank)
            .map(|rank| (rank, COMPLETE_RANK))
    }
}
