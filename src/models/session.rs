use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Incomplete,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Incomplete => "incomplete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

/// What the user actually did for one exercise. `reps_completed` keeps one slot
/// per planned set; untouched sets stay as empty strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseResult {
    pub exercise_name: String,
    pub sets_completed: u32,
    pub reps_completed: Vec<String>,
    pub weight_used: String,
    pub notes: String,
}

/// One attempt at a workout, from start to a terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    pub id: String,
    pub workout_plan_id: Option<String>,
    pub workout_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub status: SessionStatus,
    pub exercises_completed: Vec<ExerciseResult>,
}

/// Whole minutes between two instants, rounded half-up. Negative spans count as zero.
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let millis = (end - start).num_milliseconds().max(0);
    (millis as f64 / 60_000.0).round() as u32
}
