use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_json, parse_optional_datetime, parse_session_status, to_u32},
    Database,
};
use crate::models::{ExerciseResult, WorkoutSession};
use crate::workout::SessionRecorder;

const SESSION_COLUMNS: &str = "id, workout_plan_id, workout_name, start_time, end_time, \
     duration_minutes, status, exercises_completed";

fn row_to_session(row: &Row) -> Result<WorkoutSession> {
    let start_time: String = row.get("start_time")?;
    let end_time: Option<String> = row.get("end_time")?;
    let duration_minutes: Option<i64> = row.get("duration_minutes")?;
    let status: String = row.get("status")?;
    let exercises: String = row.get("exercises_completed")?;

    Ok(WorkoutSession {
        id: row.get("id")?,
        workout_plan_id: row.get("workout_plan_id")?,
        workout_name: row.get("workout_name")?,
        start_time: parse_datetime(&start_time, "start_time")?,
        end_time: parse_optional_datetime(end_time, "end_time")?,
        duration_minutes: duration_minutes
            .map(|value| to_u32(value, "duration_minutes"))
            .transpose()?,
        status: parse_session_status(&status)?,
        exercises_completed: parse_json::<Vec<ExerciseResult>>(&exercises, "exercises_completed")?,
    })
}

impl Database {
    pub async fn insert_workout_session(&self, session: &WorkoutSession) -> Result<()> {
        let record = session.clone();
        let exercises = serde_json::to_string(&record.exercises_completed)
            .context("failed to encode exercises_completed")?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO workout_sessions (id, workout_plan_id, workout_name, start_time, end_time, duration_minutes, status, exercises_completed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.workout_plan_id,
                    record.workout_name,
                    record.start_time.to_rfc3339(),
                    record.end_time.as_ref().map(|dt| dt.to_rfc3339()),
                    record.duration_minutes,
                    record.status.as_str(),
                    exercises,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert workout session {}", record.id))?;
            Ok(())
        })
        .await
    }

    pub async fn get_workout_session(&self, session_id: &str) -> Result<Option<WorkoutSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let sql = format!("SELECT {SESSION_COLUMNS} FROM workout_sessions WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row(params![session_id], |row| Ok(row_to_session(row)))
                .optional()?;
            row.transpose()
        })
        .await
    }

    /// Most recent sessions first.
    pub async fn list_workout_sessions(&self, limit: usize) -> Result<Vec<WorkoutSession>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM workout_sessions ORDER BY start_time DESC LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![limit])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    pub async fn delete_workout_session(&self, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let removed = conn.execute(
                "DELETE FROM workout_sessions WHERE id = ?1",
                params![session_id],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}

#[async_trait]
impl SessionRecorder for Database {
    async fn record(&self, session: &WorkoutSession) -> Result<()> {
        self.insert_workout_session(session).await
    }
}
