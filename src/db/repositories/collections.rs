use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{parse_datetime, parse_json},
    Database,
};
use crate::models::{CollectionWorkout, Exercise, Workout, WorkoutCollection, WorkoutPlan};

const COLLECTION_COLUMNS: &str = "id, name, description, created_at";
const WORKOUT_COLUMNS: &str = "id, collection_id, name, description, day, exercises, created_at";

fn row_to_collection(row: &Row) -> Result<WorkoutCollection> {
    let created_at: String = row.get("created_at")?;

    Ok(WorkoutCollection {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_collection_workout(row: &Row) -> Result<CollectionWorkout> {
    let exercises: String = row.get("exercises")?;
    let created_at: String = row.get("created_at")?;

    Ok(CollectionWorkout {
        id: row.get("id")?,
        collection_id: row.get("collection_id")?,
        description: row.get("description")?,
        workout: Workout {
            name: row.get("name")?,
            day: row.get("day")?,
            exercises: parse_json::<Vec<Exercise>>(&exercises, "exercises")?,
        },
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn load_collection(conn: &Connection, collection_id: &str) -> Result<Option<WorkoutCollection>> {
    let sql = format!("SELECT {COLLECTION_COLUMNS} FROM workout_collections WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row(params![collection_id], |row| Ok(row_to_collection(row)))
        .optional()?;
    row.transpose()
}

/// Newest first.
fn load_collection_workouts(conn: &Connection, collection_id: &str) -> Result<Vec<CollectionWorkout>> {
    let sql = format!(
        "SELECT {WORKOUT_COLUMNS} FROM workouts
         WHERE collection_id = ?1
         ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![collection_id])?;
    let mut workouts = Vec::new();
    while let Some(row) = rows.next()? {
        workouts.push(row_to_collection_workout(row)?);
    }
    Ok(workouts)
}

impl Database {
    /// Stores a collection, assigning a fresh id when it has none. Returns the stored id.
    pub async fn insert_collection(&self, collection: &WorkoutCollection) -> Result<String> {
        let mut record = collection.clone();
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO workout_collections (id, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.name,
                    record.description,
                    record.created_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert workout collection {}", record.id))?;
            Ok(record.id)
        })
        .await
    }

    pub async fn get_collection(&self, collection_id: &str) -> Result<Option<WorkoutCollection>> {
        let collection_id = collection_id.to_string();
        self.execute(move |conn| load_collection(conn, &collection_id))
            .await
    }

    pub async fn list_collections(&self) -> Result<Vec<WorkoutCollection>> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {COLLECTION_COLUMNS} FROM workout_collections ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut collections = Vec::new();
            while let Some(row) = rows.next()? {
                collections.push(row_to_collection(row)?);
            }
            Ok(collections)
        })
        .await
    }

    pub async fn update_collection(
        &self,
        collection_id: &str,
        name: &str,
        description: &str,
    ) -> Result<()> {
        let collection_id = collection_id.to_string();
        let name = name.to_string();
        let description = description.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE workout_collections
                 SET name = ?1,
                     description = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![name, description, Utc::now().to_rfc3339(), collection_id],
            )?;
            if updated == 0 {
                bail!("workout collection {collection_id} does not exist");
            }
            Ok(())
        })
        .await
    }

    /// Deletes a collection together with its workouts. Returns how many workouts went with it.
    pub async fn delete_collection(&self, collection_id: &str) -> Result<usize> {
        let collection_id = collection_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let workouts = tx.execute(
                "DELETE FROM workouts WHERE collection_id = ?1",
                params![collection_id],
            )?;
            let deleted = tx.execute(
                "DELETE FROM workout_collections WHERE id = ?1",
                params![collection_id],
            )?;
            if deleted == 0 {
                bail!("workout collection {collection_id} does not exist");
            }
            tx.commit()?;
            Ok(workouts)
        })
        .await
    }

    /// Stores a workout inside its collection. Returns the stored id.
    pub async fn insert_collection_workout(&self, workout: &CollectionWorkout) -> Result<String> {
        let mut record = workout.clone();
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let exercises = serde_json::to_string(&record.workout.exercises)
            .context("failed to encode exercises")?;

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO workouts (id, collection_id, name, description, day, exercises, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.collection_id,
                    record.workout.name,
                    record.description,
                    record.workout.day,
                    exercises,
                    record.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| {
                format!(
                    "failed to insert workout {:?} into collection {}",
                    record.workout.name, record.collection_id
                )
            })?;
            Ok(record.id)
        })
        .await
    }

    pub async fn list_collection_workouts(&self, collection_id: &str) -> Result<Vec<CollectionWorkout>> {
        let collection_id = collection_id.to_string();
        self.execute(move |conn| load_collection_workouts(conn, &collection_id))
            .await
    }

    pub async fn delete_collection_workout(&self, workout_id: &str) -> Result<bool> {
        let workout_id = workout_id.to_string();
        self.execute(move |conn| {
            let deleted = conn.execute("DELETE FROM workouts WHERE id = ?1", params![workout_id])?;
            Ok(deleted > 0)
        })
        .await
    }

    /// A collection and its workouts in plan form, keyed by the collection id.
    pub async fn get_collection_plan(&self, collection_id: &str) -> Result<Option<WorkoutPlan>> {
        let collection_id = collection_id.to_string();
        self.execute(move |conn| {
            let Some(collection) = load_collection(conn, &collection_id)? else {
                return Ok(None);
            };
            let workouts = load_collection_workouts(conn, &collection_id)?
                .into_iter()
                .map(|stored| stored.workout)
                .collect();
            Ok(Some(collection.as_plan(workouts)))
        })
        .await
    }
}
