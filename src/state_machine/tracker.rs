//! The polling loop that owns a job from its id to a terminal state.
//!
//! One tracker owns at most one [`Job`]. Every job it starts is stamped with
//! a generation number; a poll response is only applied if the generation it
//! was issued under is still current, so nothing that arrives after a reset
//! (or after a newer job replaced the old one) can touch state.

use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::classify::{classify, classify_error, stale};
use super::job::{Job, JobId};
use super::state::{StateMachine, Transition};
use super::view::JobView;
use crate::backend::{AnalysisBackend, BackendError, StatusResponse};
use crate::config::ProcurexConfig;

/// Timing knobs for the polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    pub poll_interval: Duration,
    /// Give up after this long without a terminal state. `None` waits forever.
    pub max_tracking: Option<Duration>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_tracking: Some(Duration::from_secs(30 * 60)),
        }
    }
}

impl TrackerSettings {
    pub fn from_config(config: &ProcurexConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_tracking: (config.max_tracking_secs > 0)
                .then(|| Duration::from_secs(config.max_tracking_secs)),
        }
    }
}

/// Result of a single polling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Still running; poll again later.
    Continue,
    /// The job reached a terminal state; polling is over.
    Finished,
    /// There was nothing to poll (no job, or already terminal). No request sent.
    Idle,
    /// The response belonged to a discarded job and was dropped.
    Stale,
}

/// Handle used to stop a running [`JobTracker::run`]. Dropping it has the
/// same effect as calling [`CancelHandle::cancel`].
pub struct CancelHandle {
    tx: oneshot::Sender<()>,
}

impl CancelHandle {
    /// Creates a handle and the signal `run` listens on.
    pub fn pair() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Returns true if the tracker was still listening.
    pub fn cancel(self) -> bool {
        self.tx.send(()).is_ok()
    }
}

pub struct JobTracker<B> {
    backend: B,
    settings: TrackerSettings,
    job: Option<Job>,
    generation: u64,
    started: Option<Instant>,
    view: watch::Sender<JobView>,
}

impl<B: AnalysisBackend> JobTracker<B> {
    pub fn new(backend: B, settings: TrackerSettings) -> Self {
        let (view, _) = watch::channel(JobView::idle());
        Self {
            backend,
            settings,
            job: None,
            generation: 0,
            started: None,
            view,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    /// Receive a fresh [`JobView`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<JobView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> JobView {
        self.view.borrow().clone()
    }

    /// Begin tracking a freshly submitted job in the `submitted` state,
    /// discarding whatever was tracked before. Returns the job's generation.
    pub fn start(&mut self, id: JobId) -> u64 {
        self.generation += 1;
        info!(job_id = %id, generation = self.generation, "tracking job");
        self.job = Some(Job::new(id));
        self.started = Some(Instant::now());
        self.publish();
        self.generation
    }

    /// Discard the job and clear the message slot. Any response still in
    /// flight for the old job will be ignored. Idempotent.
    pub fn reset(&mut self) {
        if let Some(job) = self.job.take() {
            info!(job_id = %job.id, "job discarded");
        }
        self.generation += 1;
        self.started = None;
        self.view.send_replace(JobView::idle());
    }

    /// Show a message with no job attached (used for submission failures).
    pub fn show_message(&mut self, message: impl Into<String>) {
        self.view.send_replace(JobView::submission_failed(message));
    }

    /// Issue one status request, unless there is nothing to poll.
    pub async fn poll_once(&mut self) -> PollStep {
        let Some((generation, id)) = self.begin_poll() else {
            return PollStep::Idle;
        };
        let response = self.backend.fetch_status(&id).await;
        self.apply(generation, response)
    }

    /// Apply a poll response that was issued under `generation`.
    pub fn apply(
        &mut self,
        generation: u64,
        response: Result<StatusResponse, BackendError>,
    ) -> PollStep {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "ignoring response for a discarded job"
            );
            return PollStep::Stale;
        }
        let Some(job) = self.job.as_mut() else {
            return PollStep::Stale;
        };

        let signal = match response {
            Ok(resp) => classify(resp),
            Err(e) => classify_error(&e),
        };

        let transition = StateMachine::apply(job, signal);
        match &transition {
            Transition::Advanced(stage) => info!(job_id = %job.id, stage = %stage, "stage changed"),
            Transition::OutOfOrder {
                observed,
                high_water,
            } => warn!(
                job_id = %job.id,
                observed = %observed,
                high_water,
                "ignoring out-of-order stage"
            ),
            Transition::Finished => info!(
                job_id = %job.id,
                state = job.state.name(),
                elapsed_secs = (job.updated_at - job.submitted_at).num_seconds(),
                "job finished"
            ),
            Transition::Unchanged | Transition::AlreadyTerminal => {}
        }

        let finished = job.state.is_terminal();
        self.publish();
        if finished {
            PollStep::Finished
        } else {
            PollStep::Continue
        }
    }

    /// Poll on the configured interval until the job is terminal or `cancel`
    /// fires. The first poll happens one interval after the call.
    ///
    /// Cancelling drops any request in flight and resets the tracker. The
    /// returned view is the final one published.
    pub async fn run(&mut self, mut cancel: oneshot::Receiver<()>) -> JobView {
        let period = self.settings.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let cancelled = tokio::select! {
                biased;
                _ = &mut cancel => true,
                _ = ticker.tick() => false,
            };
            if cancelled {
                self.reset();
                break;
            }

            if self.expire_if_overdue() {
                break;
            }
            let Some((generation, id)) = self.begin_poll() else {
                break;
            };

            let response = tokio::select! {
                biased;
                _ = &mut cancel => None,
                r = self.backend.fetch_status(&id) => Some(r),
            };
            let Some(response) = response else {
                self.reset();
                break;
            };

            if self.apply(generation, response) != PollStep::Continue {
                break;
            }
        }

        self.view()
    }

    // Checks that a poll is allowed and counts it.
    fn begin_poll(&mut self) -> Option<(u64, JobId)> {
        let job = self.job.as_mut()?;
        if job.state.is_terminal() {
            return None;
        }
        job.polls += 1;
        debug!(job_id = %job.id, poll = job.polls, "polling status");
        Some((self.generation, job.id.clone()))
    }

    fn expire_if_overdue(&mut self) -> bool {
        let (Some(limit), Some(started)) = (self.settings.max_tracking, self.started) else {
            return false;
        };
        if started.elapsed() < limit {
            return false;
        }
        let Some(job) = self.job.as_mut() else {
            return false;
        };
        if StateMachine::apply(job, stale()) == Transition::Finished {
            warn!(job_id = %job.id, limit_secs = limit.as_secs(), "gave up waiting for job");
            self.publish();
        }
        true
    }

    fn publish(&self) {
        let view = match &self.job {
            Some(job) => JobView::from_job(job),
            None => JobView::idle(),
        };
        self.view.send_replace(view);
    }
}
