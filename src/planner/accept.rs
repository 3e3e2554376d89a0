use anyhow::Result;

use crate::db::Database;
use crate::models::{CollectionWorkout, WorkoutCollection, WorkoutPlan};

use super::{activate, GeneratedPlan};

/// Where an accepted generation ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptedPlan {
    /// Stored as the active plan.
    Plan(WorkoutPlan),
    /// A single workout, stored inside a collection made for it.
    Collection {
        collection: WorkoutCollection,
        workout: CollectionWorkout,
    },
}

impl AcceptedPlan {
    /// The id a selection should use: the plan id or the collection id.
    pub fn source_id(&self) -> &str {
        match self {
            AcceptedPlan::Plan(plan) => &plan.id,
            AcceptedPlan::Collection { collection, .. } => &collection.id,
        }
    }
}

/// Persists a generated plan or workout.
///
/// Plans become the active plan. A single workout gets its own
/// "<name> Collection" so it can be found and started like any other.
pub async fn accept_generated(db: &Database, generated: GeneratedPlan) -> Result<AcceptedPlan> {
    match generated {
        GeneratedPlan::Plan(plan) => {
            let mut plan = activate(plan);
            plan.id = db.insert_plan(&plan).await?;
            log::info!("Accepted generated plan {:?} as {}", plan.name, plan.id);
            Ok(AcceptedPlan::Plan(plan))
        }
        GeneratedPlan::Workout(workout) => {
            let mut collection = WorkoutCollection::new(
                format!("{} Collection", workout.name),
                format!("Collection containing: {}", workout.name),
            );
            collection.id = db.insert_collection(&collection).await?;

            let mut stored = CollectionWorkout::new(collection.id.clone(), workout);
            stored.id = db.insert_collection_workout(&stored).await?;
            log::info!(
                "Accepted generated workout {:?} into collection {}",
                stored.workout.name,
                collection.id
            );
            Ok(AcceptedPlan::Collection {
                collection,
                workout: stored,
            })
        }
    }
}
