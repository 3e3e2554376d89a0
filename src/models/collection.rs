use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::workout::{PlanStatus, Workout, WorkoutPlan};

/// A user-curated folder of standalone workouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutCollection {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl WorkoutCollection {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    /// Presents the collection as a plan so its workouts can be selected and started.
    /// The plan id is the collection id.
    pub fn as_plan(&self, workouts: Vec<Workout>) -> WorkoutPlan {
        WorkoutPlan {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            goal: String::new(),
            duration_weeks: 0,
            workouts_per_week: 0,
            difficulty_level: String::new(),
            equipment_needed: Vec::new(),
            status: PlanStatus::Draft,
            ai_generated: false,
            workouts,
            created_at: self.created_at,
        }
    }
}

/// A workout stored on its own inside a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionWorkout {
    #[serde(default)]
    pub id: String,
    pub collection_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub workout: Workout,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl CollectionWorkout {
    pub fn new(collection_id: impl Into<String>, workout: Workout) -> Self {
        Self {
            id: String::new(),
            collection_id: collection_id.into(),
            description: String::new(),
            workout,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exercise;
    use pretty_assertions::assert_eq;

    #[test]
    fn collection_plan_carries_the_collection_id() {
        let mut collection = WorkoutCollection::new("Travel", "Hotel room sessions");
        collection.id = "col-1".into();
        let plan = collection.as_plan(vec![Workout::new(
            "Quick Circuit",
            vec![Exercise::new("Burpees", 3, "10")],
        )]);

        assert_eq!(plan.id, "col-1");
        assert_eq!(plan.name, "Travel");
        assert!(plan.find_workout("Quick Circuit").is_some());
    }

    #[test]
    fn collection_workout_reads_flat_json() {
        let stored: CollectionWorkout = serde_json::from_str(
            r#"{"collection_id": "col-1", "name": "Core", "exercises": [{"name": "Plank", "sets": 0}]}"#,
        )
        .unwrap();

        assert_eq!(stored.workout.name, "Core");
        assert_eq!(stored.workout.exercises[0].sets, 1);
        assert_eq!(stored.description, "");
    }
}
