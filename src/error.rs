use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcurexError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The three ways a tracked job can end badly.
///
/// None of them is retried by the controller; retrying always means a fresh
/// submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The document never reached the pipeline. No job exists.
    #[error("Submission failed: {message}")]
    SubmissionFailed { message: String },

    /// The pipeline ran and rejected the input.
    #[error("Analysis failed: {message}")]
    PipelineFailed { message: String, kind: FailureKind },

    /// The job exists but the client can no longer observe it.
    #[error("Connection lost: {message}")]
    ConnectionLost { message: String, kind: FailureKind },
}

impl JobError {
    /// The user-facing message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            JobError::SubmissionFailed { message }
            | JobError::PipelineFailed { message, .. }
            | JobError::ConnectionLost { message, .. } => message,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::SubmissionFailed { .. } => FailureKind::Submission,
            JobError::PipelineFailed { kind, .. } | JobError::ConnectionLost { kind, .. } => *kind,
        }
    }
}

/// Machine classification of a job failure, so callers can pick a remedy
/// (fix the input vs. retry later) without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The submission request could not be delivered or was rejected.
    Submission,
    /// The pipeline reported a failure.
    Pipeline,
    /// The pipeline decided the upload is not a tender document.
    NotATender,
    /// A poll could not be completed.
    Connection,
    /// Tracking gave up after the configured maximum time.
    Stale,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Submission => write!(f, "Submission"),
            FailureKind::Pipeline => write!(f, "Pipeline"),
            FailureKind::NotATender => write!(f, "NotATender"),
            FailureKind::Connection => write!(f, "Connection"),
            FailureKind::Stale => write!(f, "Stale"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_error_display_and_message() {
        let err = JobError::PipelineFailed {
            message: "Invalid PDF".into(),
            kind: FailureKind::Pipeline,
        };
        assert_eq!(err.to_string(), "Analysis failed: Invalid PDF");
        assert_eq!(err.message(), "Invalid PDF");
        assert_eq!(err.kind(), FailureKind::Pipeline);
    }

    #[test]
    fn submission_failed_kind() {
        let err = JobError::SubmissionFailed {
            message: "backend down".into(),
        };
        assert_eq!(err.kind(), FailureKind::Submission);
        assert_eq!(err.to_string(), "Submission failed: backend down");
    }

    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::NotATender).unwrap();
        assert_eq!(json, r#""not_a_tender""#);
    }
}
