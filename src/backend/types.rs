//! Wire types for the ProcureX HTTP API.
//!
//! These mirror the JSON the FastAPI service emits. The status payload is
//! deliberately loose: while a job runs it carries `status`, once complete
//! the service returns the bare result bundle with no `status` at all, and a
//! failed job comes back as HTTP 500 with `status: "failed"`. Result
//! sections are kept as raw JSON here and decoded leniently by
//! [`crate::report`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body returned by `POST /analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Opaque identifier of the newly created job.
    pub job_id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub poll_url: Option<String>,
}

/// Body returned by `GET /status/{job_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    /// Current pipeline stage, `complete`, or `failed`. Absent on a completed job.
    #[serde(default)]
    pub status: Option<String>,
    /// Failure message, only meaningful when `status` is `failed`.
    #[serde(default)]
    pub error: Option<String>,
    /// Set by the backend when the upload was not recognised as a tender.
    #[serde(default)]
    pub not_a_tender: Option<bool>,
    /// Free-text progress note ("Pipeline running... current stage: ...").
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tender_extraction: Option<Value>,
    #[serde(default)]
    pub eligibility_report: Option<Value>,
    #[serde(default)]
    pub market_intelligence: Option<Value>,
    #[serde(default)]
    pub bid_strategy: Option<Value>,
}

impl StatusResponse {
    /// A status-only response, as the backend sends while a stage is running.
    pub fn running(status: &str) -> Self {
        Self {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    /// True when the bid strategy section is a non-empty JSON object.
    ///
    /// Workaround: the backend may omit or lag the `status` field after the
    /// pipeline has produced its final artifact, so the presence of this
    /// section is treated as the authoritative completion signal.
    pub fn has_bid_strategy(&self) -> bool {
        match &self.bid_strategy {
            Some(Value::Object(fields)) => !fields.is_empty(),
            _ => false,
        }
    }

    /// True when any of the four result sections is present and not `null`.
    pub fn has_result_sections(&self) -> bool {
        [
            &self.tender_extraction,
            &self.eligibility_report,
            &self.market_intelligence,
            &self.bid_strategy,
        ]
        .into_iter()
        .any(|section| !matches!(section, None | Some(Value::Null)))
    }
}

/// FastAPI error body (`{"detail": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    /// Human-readable form of `detail`, which FastAPI emits either as a string
    /// or as a list of validation errors.
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub google_api_key_set: bool,
}
