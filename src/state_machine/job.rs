use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::{COMPLETE_RANK, Stage};
use crate::error::{FailureKind, JobError};
use crate::report::ResultBundle;

/// Opaque job identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a job ended without a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: FailureKind,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Where a job is in its lifecycle.
///
/// The terminal variants carry the result or the error, so a job can never
/// hold both, and holds neither until it finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum LifecycleState {
    Active(Stage),
    Complete(Box<ResultBundle>),
    Failed(ErrorDetail),
    ConnectionLost(ErrorDetail),
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LifecycleState::Active(_))
    }

    /// Wire-style name: the stage name while active, else the terminal name.
    pub fn name(&self) -> &str {
        match self {
            LifecycleState::Active(stage) => stage.as_str(),
            LifecycleState::Complete(_) => "complete",
            LifecycleState::Failed(_) => "failed",
            LifecycleState::ConnectionLost(_) => "connection_lost",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            LifecycleState::Active(stage) => stage.label(),
            LifecycleState::Complete(_) => "Complete",
            LifecycleState::Failed(_) => "Failed",
            LifecycleState::ConnectionLost(_) => "Connection Lost",
        }
    }

    pub fn result(&self) -> Option<&ResultBundle> {
        match self {
            LifecycleState::Complete(bundle) => Some(bundle),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&ErrorDetail> {
        match self {
            LifecycleState::Failed(detail) | LifecycleState::ConnectionLost(detail) => {
                Some(detail)
            }
            _ => None,
        }
    }

    /// The terminal failure expressed as a [`JobError`], if any.
    pub fn error(&self) -> Option<JobError> {
        match self {
            LifecycleState::Failed(detail) => Some(JobError::PipelineFailed {
                message: detail.message.clone(),
                kind: detail.kind,
            }),
            LifecycleState::ConnectionLost(detail) => Some(JobError::ConnectionLost {
                message: detail.message.clone(),
                kind: detail.kind,
            }),
            _ => None,
        }
    }

    /// Pipeline rank of an active known stage, or [`COMPLETE_RANK`] once complete.
    pub fn rank(&self) -> Option<u8> {
        match self {
            LifecycleState::Active(stage) => stage.rank(),
            LifecycleState::Complete(_) => Some(COMPLETE_RANK),
            _ => None,
        }
    }
}

/// One tracked submission, from job id to terminal state.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub state: LifecycleState,
    /// Stages left behind, oldest first.
    pub state_history: Vec<Stage>,
    /// Highest known stage rank observed so far.
    pub high_water: u8,
    pub polls: u32,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: LifecycleState::Active(Stage::Submitted),
            state_history: Vec::new(),
            high_water: 0,
            polls: 0,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// The stage the job is in, while it is still running.
    pub fn stage(&self) -> Option<&Stage> {
        match &self.state {
            LifecycleState::Active(stage) => Some(stage),
            _ => None,
        }
    }
}
