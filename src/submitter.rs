//! Job submission: the document, the company profile sent alongside it, and
//! the single request that turns them into a job id.
//!
//! Every profile field has a fallback matching the backend's own form
//! defaults, so an empty [`CompanyProfile`] is always submittable.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::{AnalysisBackend, BackendError};
use crate::error::{JobError, ProcurexError};
use crate::state_machine::JobId;

const DEFAULT_COMPANY_NAME: &str = "My Company";
const DEFAULT_DOMAIN_EXPERTISE: &[&str] = &["software development", "AI/ML"];
const DEFAULT_CERTIFICATIONS: &[&str] = &["ISO 9001:2015"];
const DEFAULT_REGISTERED_AS: &str = "Pvt Ltd";

/// A PDF held in memory, ready to be sent as the `file` part.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads a document from disk, rejecting non-PDF names and files over
    /// `max_bytes` before anything is sent.
    pub fn load(path: &Path, max_bytes: u64) -> Result<Self, ProcurexError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ProcurexError::Document(format!("Not a file: {}", path.display())))?;

        if !file_name.to_lowercase().ends_with(".pdf") {
            return Err(ProcurexError::Document(
                "Only PDF files are accepted.".to_string(),
            ));
        }

        let size = std::fs::metadata(path)?.len();
        if size > max_bytes {
            return Err(ProcurexError::Document(format!(
                "File too large. Please upload a PDF under {}.",
                human_size(max_bytes)
            )));
        }

        let bytes = std::fs::read(path)?;
        Ok(Self { file_name, bytes })
    }
}

/// Company attributes the eligibility agent compares against the tender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub company_name: String,
    pub domain_expertise: Vec<String>,
    /// Annual turnover in crore INR.
    pub annual_turnover_cr: f64,
    pub years_in_operation: u32,
    pub certifications: Vec<String>,
    pub prior_govt_projects: u32,
    pub technical_team_size: u32,
    pub registered_as: String,
    pub msme_registered: bool,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            domain_expertise: to_owned_list(DEFAULT_DOMAIN_EXPERTISE),
            annual_turnover_cr: 15.0,
            years_in_operation: 8,
            certifications: to_owned_list(DEFAULT_CERTIFICATIONS),
            prior_govt_projects: 2,
            technical_team_size: 30,
            registered_as: DEFAULT_REGISTERED_AS.to_string(),
            msme_registered: true,
        }
    }
}

impl CompanyProfile {
    /// Multipart text fields, in the order the backend declares them.
    /// Blank strings and empty lists fall back to the defaults.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "company_name",
                or_default(&self.company_name, DEFAULT_COMPANY_NAME),
            ),
            (
                "domain_expertise",
                join_or_default(&self.domain_expertise, DEFAULT_DOMAIN_EXPERTISE),
            ),
            ("annual_turnover_cr", self.annual_turnover_cr.to_string()),
            ("years_in_operation", self.years_in_operation.to_string()),
            (
                "certifications",
                join_or_default(&self.certifications, DEFAULT_CERTIFICATIONS),
            ),
            ("prior_govt_projects", self.prior_govt_projects.to_string()),
            ("technical_team_size", self.technical_team_size.to_string()),
            (
                "registered_as",
                or_default(&self.registered_as, DEFAULT_REGISTERED_AS),
            ),
            ("msme_registered", self.msme_registered.to_string()),
        ]
    }
}

/// Everything sent in one submission. Immutable once built.
#[derive(Debug, Clone)]
pub struct SubmissionPayload {
    pub document: Document,
    pub profile: CompanyProfile,
}

/// Sends a payload to the backend. Holds no state between calls.
pub struct JobSubmitter;

impl JobSubmitter {
    /// Issues exactly one submission request and returns either the job id or
    /// [`JobError::SubmissionFailed`]. Never retries.
    pub async fn submit(
        backend: &impl AnalysisBackend,
        payload: &SubmissionPayload,
    ) -> Result<JobId, JobError> {
        match backend.submit(payload).await {
            Ok(id) => {
                info!(job_id = %id, file = %payload.document.file_name, "job submitted");
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "submission failed");
                Err(JobError::SubmissionFailed {
                    message: submission_message(&e),
                })
            }
        }
    }
}

fn submission_message(err: &BackendError) -> String {
    match err {
        BackendError::Network(_) => {
            "Could not reach the analysis backend. Is it running?".to_string()
        }
        BackendError::Api { message, .. } => message.clone(),
        BackendError::Decode(detail) => {
            format!("The analysis backend sent an unexpected reply: {detail}")
        }
    }
}

// Whole MB when the limit allows it, otherwise KB or bytes.
fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes >= MB {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes} bytes")
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn or_default(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn join_or_default(values: &[String], fallback: &[&str]) -> String {
    let kept: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if kept.is_empty() {
        fallback.join(", ")
    } else {
        kept.join(", ")
    }
}
