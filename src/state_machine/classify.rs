//! Turns raw status payloads and transport errors into [`Signal`]s.

use tracing::warn;

use super::job::ErrorDetail;
use super::stage::{COMPLETE_SENTINEL, FAILED_SENTINEL, Stage};
use super::state::Signal;
use crate::backend::{BackendError, StatusResponse};
use crate::error::FailureKind;
use crate::report::ResultBundle;

pub const CONNECTION_LOST_MESSAGE: &str =
    "Connection lost. Is the analysis backend still running?";
pub const STALE_JOB_MESSAGE: &str =
    "Stopped tracking: the analysis did not finish in time. The backend may still be working on it.";
const MISSING_FAILURE_MESSAGE: &str = "The analysis pipeline failed without an explanation.";

// Wording the backend uses when the upload is not a tender document. The
// HTTP 500 failure body drops the `not_a_tender` flag, so the scanned-PDF
// wording is matched here as well.
const NOT_A_TENDER_PHRASES: &[&str] = &[
    "not a tender",
    "That's not a tender",
    "Nice try",
    "agents are confused",
    "Error 404: Tender",
    "image-based and contains no readable text",
];

/// Classify one status payload. First match wins:
///
/// 1. a populated bid strategy means complete, whatever `status` says;
/// 2. `failed` means the pipeline rejected the job;
/// 3. `complete` means done;
/// 4. anything else is the current stage, passed through verbatim.
///
/// A completed job comes back as the bare bundle with no `status`, so a
/// payload without a status but with any result section is complete too.
/// A payload with neither a status nor a result section is malformed.
pub fn classify(resp: StatusResponse) -> Signal {
    // Workaround: the backend's status can lag (or be dropped) once the final
    // artifact exists, so completion is detected from the payload shape.
    if resp.has_bid_strategy() {
        return Signal::Completed(ResultBundle::from_response(&resp));
    }

    match resp.status.as_deref() {
        Some(FAILED_SENTINEL) => {
            let message = resp
                .error
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| MISSING_FAILURE_MESSAGE.to_string());
            let kind = if resp.not_a_tender == Some(true) || mentions_not_a_tender(&message) {
                FailureKind::NotATender
            } else {
                FailureKind::Pipeline
            };
            Signal::Failed(ErrorDetail::new(kind, message))
        }
        Some(COMPLETE_SENTINEL) => Signal::Completed(ResultBundle::from_response(&resp)),
        Some(status) => Signal::Stage(Stage::parse(status)),
        None if resp.has_result_sections() => {
            Signal::Completed(ResultBundle::from_response(&resp))
        }
        None => {
            warn!("status payload has neither a status nor a result");
            connection_lost()
        }
    }
}

/// Any failed poll means the job can no longer be observed.
pub fn classify_error(err: &BackendError) -> Signal {
    warn!(error = %err, "status poll failed");
    connection_lost()
}

pub fn stale() -> Signal {
    Signal::Unreachable(ErrorDetail::new(FailureKind::Stale, STALE_JOB_MESSAGE))
}

fn connection_lost() -> Signal {
    Signal::Unreachable(ErrorDetail::new(
        FailureKind::Connection,
        CONNECTION_LOST_MESSAGE,
    ))
}

fn mentions_not_a_tender(message: &str) -> bool {
    NOT_A_TENDER_PHRASES.iter().any(|p| message.contains(p))
}
