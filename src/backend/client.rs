use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::debug;

use super::error::BackendError;
use super::types::{ErrorBody, HealthResponse, StatusResponse, SubmitResponse};
use crate::config::ProcurexConfig;
use crate::state_machine::{FAILED_SENTINEL, JobId};
use crate::submitter::SubmissionPayload;

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// The two calls the job lifecycle needs from the analysis service.
///
/// Implemented by [`ProcurexClient`] over HTTP and by scripted fakes in tests.
#[allow(async_fn_in_trait)]
pub trait AnalysisBackend {
    /// Dispatch a document and profile, returning the backend's job id.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<JobId, BackendError>;

    /// Read the current status of a job. Read-only and idempotent.
    async fn fetch_status(&self, job_id: &JobId) -> Result<StatusResponse, BackendError>;
}

#[derive(Clone)]
pub struct ProcurexClient {
    client: Client,
    base_url: String,
}

impl ProcurexClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(base_url: String) -> Self {
        Self::build(base_url, Duration::from_secs(10), Duration::from_secs(30))
    }

    /// Create a client from the loaded configuration. The request timeout
    /// bounds every single poll.
    pub fn from_config(config: &ProcurexConfig) -> Self {
        Self::build(
            config.api_url.clone(),
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn build(base_url: String, connect_timeout: Duration, timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse, BackendError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl Default for ProcurexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisBackend for ProcurexClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<JobId, BackendError> {
        let document = &payload.document;
        let file = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str("application/pdf")?;

        let mut form = Form::new().part("file", file);
        for (name, value) in payload.profile.form_fields() {
            form = form.text(name, value);
        }

        debug!(
            file = %document.file_name,
            bytes = document.bytes.len(),
            "submitting document"
        );
        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body = response.text().await?;
        let parsed: SubmitResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))?;
        if parsed.job_id.trim().is_empty() {
            return Err(BackendError::Decode("empty job_id".into()));
        }
        Ok(JobId::new(parsed.job_id))
    }

    async fn fetch_status(&self, job_id: &JobId) -> Result<StatusResponse, BackendError> {
        let response = self
            .client
            .get(format!("{}/status/{}", self.base_url, job_id))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(job_id = %job_id, status = status.as_u16(), "status polled");

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()));
        }

        // A failed pipeline is reported as HTTP 500 carrying a regular status
        // payload; that is a backend verdict, not a transport problem.
        if let Ok(parsed) = serde_json::from_str::<StatusResponse>(&body) {
            if parsed.status.as_deref() == Some(FAILED_SENTINEL) {
                return Ok(parsed);
            }
        }

        Err(BackendError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

async fn api_error(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Api {
        status,
        message: error_message(&body),
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message(),
        Err(_) if body.trim().is_empty() => "unknown error".to_string(),
        Err(_) => body.to_string(),
    }
}
