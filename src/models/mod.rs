pub mod collection;
pub mod session;
pub mod workout;

pub use collection::{CollectionWorkout, WorkoutCollection};
pub use session::{duration_minutes, ExerciseResult, SessionStatus, WorkoutSession};
pub use workout::{Exercise, PlanStatus, Workout, WorkoutPlan, DEFAULT_REST_SECONDS};
