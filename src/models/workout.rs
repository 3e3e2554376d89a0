use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_REST_SECONDS: u32 = 60;

fn default_rest_seconds() -> u32 {
    DEFAULT_REST_SECONDS
}

fn default_sets() -> u32 {
    1
}

fn at_least_one_set<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u32::deserialize(deserializer)?.max(1))
}

/// One movement inside a workout. `reps` is free-form ("8-12", "AMRAP").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub name: String,
    #[serde(default = "default_sets", deserialize_with = "at_least_one_set")]
    pub sets: u32,
    #[serde(default)]
    pub reps: String,
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub muscle_groups: BTreeSet<String>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, sets: u32, reps: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sets: sets.max(1),
            reps: reps.into(),
            rest_seconds: DEFAULT_REST_SECONDS,
            duration_seconds: None,
            instructions: None,
            muscle_groups: BTreeSet::new(),
        }
    }

    pub fn with_rest(mut self, rest_seconds: u32) -> Self {
        self.rest_seconds = rest_seconds;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl Workout {
    pub fn new(name: impl Into<String>, exercises: Vec<Exercise>) -> Self {
        Self {
            name: name.into(),
            day: None,
            exercises,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Active => "active",
            PlanStatus::Archived => "archived",
        }
    }
}

/// A multi-week program: an ordered list of workouts plus descriptive metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutPlan {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub duration_weeks: u32,
    #[serde(default)]
    pub workouts_per_week: u32,
    #[serde(default)]
    pub difficulty_level: String,
    #[serde(default)]
    pub equipment_needed: Vec<String>,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub workouts: Vec<Workout>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl WorkoutPlan {
    pub fn find_workout(&self, name: &str) -> Option<&Workout> {
        self.workouts.iter().find(|workout| workout.name == name)
    }
}
