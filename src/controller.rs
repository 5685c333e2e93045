//! The job lifecycle controller: submit, track, reset.
//!
//! [`JobController`] is the single entry point for a presentation layer. It
//! owns one [`JobTracker`], uses [`JobSubmitter`] to obtain job ids, and
//! publishes every state change as a [`JobView`].

use tokio::sync::{oneshot, watch};

use crate::backend::AnalysisBackend;
use crate::error::JobError;
use crate::state_machine::{JobId, JobTracker, JobView, PollStep, TrackerSettings};
use crate::submitter::{JobSubmitter, SubmissionPayload};

pub struct JobController<B> {
    tracker: JobTracker<B>,
}

impl<B: AnalysisBackend> JobController<B> {
    pub fn new(backend: B, settings: TrackerSettings) -> Self {
        Self {
            tracker: JobTracker::new(backend, settings),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<JobView> {
        self.tracker.subscribe()
    }

    pub fn view(&self) -> JobView {
        self.tracker.view()
    }

    pub fn tracker(&self) -> &JobTracker<B> {
        &self.tracker
    }

    /// Submit a document and start tracking the new job.
    ///
    /// Any previous job is discarded first and the message slot cleared. On
    /// failure no job exists and the message slot holds the reason.
    pub async fn submit(&mut self, payload: &SubmissionPayload) -> Result<JobId, JobError> {
        self.tracker.reset();
        match JobSubmitter::submit(self.tracker.backend(), payload).await {
            Ok(id) => {
                self.tracker.start(id.clone());
                Ok(id)
            }
            Err(e) => {
                self.tracker.show_message(e.message());
                Err(e)
            }
        }
    }

    /// Poll until the job is terminal or `cancel` fires.
    pub async fn track(&mut self, cancel: oneshot::Receiver<()>) -> JobView {
        self.tracker.run(cancel).await
    }

    /// One poll, for callers that drive their own timer.
    pub async fn poll_once(&mut self) -> PollStep {
        self.tracker.poll_once().await
    }

    /// Cancel polling and discard the job. Always succeeds.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }

    /// The terminal outcome of the current job, if it has one.
    pub fn outcome(&self) -> Option<Result<JobView, JobError>> {
        let view = self.tracker.view();
        let lifecycle = view.lifecycle.as_ref()?;
        if !lifecycle.is_terminal() {
            return None;
        }
        Some(match lifecycle.error() {
            Some(err) => Err(err),
            None => Ok(view),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, StatusResponse};
    use crate::error::FailureKind;
    use crate::state_machine::{CancelHandle, CONNECTION_LOST_MESSAGE, Stage};
    use crate::submitter::{CompanyProfile, Document};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Hands out sequential job ids and replays scripted status replies.
    #[derive(Default)]
    struct FakeBackend {
        reject_next_submit: Mutex<Option<BackendError>>,
        replies: Mutex<VecDeque<Result<StatusResponse, BackendError>>>,
        submits: AtomicU32,
        polls: AtomicU32,
    }

    impl FakeBackend {
        fn script(&self, replies: Vec<serde_json::Value>) {
            let mut queue = self.replies.lock().unwrap();
            for body in replies {
                queue.push_back(Ok(serde_json::from_value(body).unwrap()));
            }
        }
    }

    impl AnalysisBackend for FakeBackend {
        async fn submit(&self, _payload: &SubmissionPayload) -> Result<JobId, BackendError> {
            let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(err) = self.reject_next_submit.lock().unwrap().take() {
                return Err(err);
            }
            Ok(JobId::new(format!("job-{n}")))
        }

        async fn fetch_status(&self, _job_id: &JobId) -> Result<StatusResponse, BackendError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(BackendError::Decode("script exhausted".into())))
        }
    }

    fn payload() -> SubmissionPayload {
        SubmissionPayload {
            document: Document::from_bytes("tender.pdf", b"%PDF".to_vec()),
            profile: CompanyProfile::default(),
        }
    }

    fn controller() -> JobController<FakeBackend> {
        JobController::new(FakeBackend::default(), TrackerSettings::default())
    }

    #[tokio::test]
    async fn submit_starts_job_in_submitted_state() {
        let mut c = controller();
        let id = c.submit(&payload()).await.unwrap();
        assert_eq!(id.as_str(), "job-1");

        let job = c.tracker().job().unwrap();
        assert_eq!(job.stage(), Some(&Stage::Submitted));
        assert!(c.view().message.is_none());
        assert!(c.outcome().is_none());
    }

    #[tokio::test]
    async fn submission_failure_creates_no_job() {
        let mut c = controller();
        *c.tracker().backend().reject_next_submit.lock().unwrap() =
            Some(BackendError::Api {
                status: 503,
                message: "Service Unavailable".into(),
            });

        let err = c.submit(&payload()).await.unwrap_err();
        assert_eq!(
            err,
            JobError::SubmissionFailed {
                message: "Service Unavailable".into()
            }
        );
        assert!(c.tracker().job().is_none());
        assert_eq!(c.view().message.as_deref(), Some("Service Unavailable"));
        assert_eq!(c.poll_once().await, PollStep::Idle);
        assert_eq!(c.tracker().backend().polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn new_submission_does_not_leak_previous_job() {
        let mut c = controller();
        c.tracker()
            .backend()
            .script(vec![json!({"status": "failed", "error": "Invalid PDF"})]);

        c.submit(&payload()).await.unwrap();
        assert_eq!(c.poll_once().await, PollStep::Finished);
        assert!(matches!(
            c.outcome(),
            Some(Err(JobError::PipelineFailed { .. }))
        ));

        let id = c.submit(&payload()).await.unwrap();
        assert_eq!(id.as_str(), "job-2");
        let view = c.view();
        assert!(view.message.is_none());
        assert!(view.result().is_none());
        assert_eq!(view.label(), "Queued");
        let job = c.tracker().job().unwrap();
        assert!(job.state_history.is_empty());
        assert_eq!(job.polls, 0);
    }

    #[tokio::test]
    async fn reset_after_completion_clears_everything() {
        let mut c = controller();
        c.tracker()
            .backend()
            .script(vec![json!({"bid_strategy": {"bid_decision": "BID"}})]);
        c.submit(&payload()).await.unwrap();
        c.poll_once().await;
        assert!(matches!(c.outcome(), Some(Ok(_))));

        c.reset();
        assert_eq!(c.view(), JobView::idle());
        assert!(c.outcome().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn track_ends_in_connection_lost_when_backend_vanishes() {
        let mut c = controller();
        c.tracker()
            .backend()
            .script(vec![json!({"status": "ingesting"})]);
        c.submit(&payload()).await.unwrap();

        let (_handle, cancel) = CancelHandle::pair();
        let view = c.track(cancel).await;

        assert_eq!(view.message.as_deref(), Some(CONNECTION_LOST_MESSAGE));
        match c.outcome() {
            Some(Err(JobError::ConnectionLost { kind, .. })) => {
                assert_eq!(kind, FailureKind::Connection)
            }
            other => panic!("expected ConnectionLost, got {other:?}"),
        }
        assert_eq!(c.tracker().backend().polls.load(Ordering::SeqCst), 2);
    }
}
