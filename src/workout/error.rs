use thiserror::Error;

use super::controller::SessionPhase;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("workout has no exercises")]
    EmptyWorkout,
    #[error("set index {index} is outside 0..{sets}")]
    OutOfRange { index: usize, sets: usize },
    #[error("session could not be recorded: {reason}")]
    RecordingFailed { reason: String },
    #[error("no plan with id {id}")]
    PlanNotFound { id: String },
    #[error("no workout named {name:?}")]
    WorkoutNotFound { name: String },
    #[error("cannot {action} while {phase}")]
    InvalidState {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error("finish or skip the rest period before completing the next set")]
    RestInProgress,
    #[error("workout runtime has shut down")]
    RuntimeClosed,
}

impl SessionError {
    pub(crate) fn invalid(action: &'static str, phase: SessionPhase) -> Self {
        Self::InvalidState { action, phase }
    }
}
