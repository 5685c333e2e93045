use chrono::Utc;

use super::job::{ErrorDetail, Job, LifecycleState};
use super::stage::Stage;
use crate::report::ResultBundle;

/// What one poll told us about the job, after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// The pipeline is (still) running this stage.
    Stage(Stage),
    /// The pipeline finished and produced a result.
    Completed(ResultBundle),
    /// The pipeline reported a failure.
    Failed(ErrorDetail),
    /// The client could not observe the pipeline.
    Unreachable(ErrorDetail),
}

/// The effect a signal had on a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Moved to a new running stage.
    Advanced(Stage),
    /// Same stage as before.
    Unchanged,
    /// A stage earlier than one already observed; ignored.
    OutOfOrder { observed: Stage, high_water: u8 },
    /// Entered a terminal state.
    Finished,
    /// The job was already terminal; nothing changed.
    AlreadyTerminal,
}

/// Drives a [`Job`] forward from classified poll signals.
pub struct StateMachine;

impl StateMachine {
    /// Apply a signal to the job and return what changed.
    ///
    /// - Terminal states absorb every signal.
    /// - A known stage ranked below the high-water mark is ignored, so the
    ///   job never moves backwards.
    /// - Unknown stages are shown as-is but do not move the high-water mark.
    pub fn apply(job: &mut Job, signal: Signal) -> Transition {
        let current = match &job.state {
            LifecycleState::Active(stage) => stage.clone(),
            _ => return Transition::AlreadyTerminal,
        };

        let transition = match signal {
            Signal::Stage(stage) if stage == current => Transition::Unchanged,
            Signal::Stage(stage) => match stage.rank() {
                Some(rank) if rank < job.high_water => Transition::OutOfOrder {
                    observed: stage,
                    high_water: job.high_water,
                },
                rank => {
                    if let Some(rank) = rank {
                        job.high_water = rank;
                    }
                    job.state_history.push(current);
                    job.state = LifecycleState::Active(stage.clone());
                    Transition::Advanced(stage)
                }
            },
            Signal::Completed(bundle) => {
                job.state_history.push(current);
                job.state = LifecycleState::Complete(Box::new(bundle));
                Transition::Finished
            }
            Signal::Failed(detail) => {
                job.state_history.push(current);
                job.state = LifecycleState::Failed(detail);
                Transition::Finished
            }
            Signal::Unreachable(detail) => {
                job.state_history.push(current);
                job.state = LifecycleState::ConnectionLost(detail);
                Transition::Finished
            }
        };

        if !matches!(transition, Transition::OutOfOrder { .. }) {
            job.updated_at = Utc::now();
        }
        transition
    }
}
