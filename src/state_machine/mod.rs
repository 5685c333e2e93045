mod classify;
mod job;
mod stage;
mod state;
mod tracker;
mod view;

pub use classify::{CONNECTION_LOST_MESSAGE, STALE_JOB_MESSAGE, classify, classify_error};
pub use job::{ErrorDetail, Job, JobId, LifecycleState};
pub use stage::{COMPLETE_RANK, COMPLETE_SENTINEL, FAILED_SENTINEL, Stage};
pub use state::{Signal, StateMachine, Transition};
pub use tracker::{CancelHandle, JobTracker, PollStep, TrackerSettings};
pub use view::JobView;
