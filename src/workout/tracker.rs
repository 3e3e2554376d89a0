use serde::Serialize;

use crate::models::{Exercise, ExerciseResult};

use super::error::SessionError;

/// Scratch record for the exercise currently on screen.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExerciseTracker {
    exercise_name: String,
    sets: usize,
    completed_sets: u32,
    reps: Vec<String>,
    weight: String,
    notes: String,
}

/// Immutable copy of the tracker taken when an exercise is finished or skipped.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackerSnapshot {
    pub exercise_name: String,
    pub sets: usize,
    pub completed_sets: u32,
    pub reps: Vec<String>,
    pub weight: String,
    pub notes: String,
}

impl ExerciseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebinds the tracker to `exercise`. Always keeps at least one set slot.
    pub fn reset(&mut self, exercise: &Exercise) {
        let sets = exercise.sets.max(1) as usize;
        *self = Self {
            exercise_name: exercise.name.clone(),
            sets,
            completed_sets: 0,
            reps: vec![String::new(); sets],
            weight: String::new(),
            notes: String::new(),
        };
    }

    pub fn record_rep(&mut self, set_index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        let sets = self.sets;
        let slot = self
            .reps
            .get_mut(set_index)
            .ok_or(SessionError::OutOfRange {
                index: set_index,
                sets,
            })?;
        *slot = value.into();
        Ok(())
    }

    pub fn set_weight(&mut self, value: impl Into<String>) {
        self.weight = value.into();
    }

    pub fn set_notes(&mut self, value: impl Into<String>) {
        self.notes = value.into();
    }

    pub(crate) fn mark_set_completed(&mut self) {
        self.completed_sets = (self.completed_sets + 1).min(self.sets as u32);
    }

    pub fn sets(&self) -> usize {
        self.sets
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            exercise_name: self.exercise_name.clone(),
            sets: self.sets,
            completed_sets: self.completed_sets,
            reps: self.reps.clone(),
            weight: self.weight.clone(),
            notes: self.notes.clone(),
        }
    }
}

impl From<TrackerSnapshot> for ExerciseResult {
    fn from(snapshot: TrackerSnapshot) -> Self {
        Self {
            exercise_name: snapshot.exercise_name,
            sets_completed: snapshot.completed_sets,
            reps_completed: snapshot.reps,
            weight_used: snapshot.weight,
            notes: snapshot.notes,
        }
    }
}
