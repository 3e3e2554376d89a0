pub mod controller;
pub mod error;
pub mod recorder;
pub mod runtime;
pub mod selection;
pub mod tracker;

pub use controller::{
    RecordStatus, SessionController, SessionPhase, SessionSnapshot, SetEntry, TickOutcome,
};
pub use error::SessionError;
pub use recorder::{MemoryRecorder, SessionRecorder};
pub use runtime::{WorkoutEvent, WorkoutHandle, WorkoutRuntime};
pub use selection::{resolve_selection, PlanSource, Selection};
pub use tracker::{ExerciseTracker, TrackerSnapshot};
