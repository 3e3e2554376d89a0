use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{parse_datetime, parse_json, parse_plan_status, to_u32},
    Database,
};
use crate::models::{PlanStatus, Workout, WorkoutPlan};
use crate::workout::PlanSource;

const PLAN_COLUMNS: &str = "id, name, description, goal, duration_weeks, workouts_per_week, \
     difficulty_level, equipment_needed, status, ai_generated, workouts, created_at";

fn row_to_plan(row: &Row) -> Result<WorkoutPlan> {
    let duration_weeks: i64 = row.get("duration_weeks")?;
    let workouts_per_week: i64 = row.get("workouts_per_week")?;
    let equipment: String = row.get("equipment_needed")?;
    let status: String = row.get("status")?;
    let workouts: String = row.get("workouts")?;
    let created_at: String = row.get("created_at")?;

    Ok(WorkoutPlan {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        goal: row.get("goal")?,
        duration_weeks: to_u32(duration_weeks, "duration_weeks")?,
        workouts_per_week: to_u32(workouts_per_week, "workouts_per_week")?,
        difficulty_level: row.get("difficulty_level")?,
        equipment_needed: parse_json::<Vec<String>>(&equipment, "equipment_needed")?,
        status: parse_plan_status(&status)?,
        ai_generated: row.get("ai_generated")?,
        workouts: parse_json::<Vec<Workout>>(&workouts, "workouts")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn query_plans(conn: &rusqlite::Connection, sql: &str) -> Result<Vec<WorkoutPlan>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut plans = Vec::new();
    while let Some(row) = rows.next()? {
        plans.push(row_to_plan(row)?);
    }
    Ok(plans)
}

impl Database {
    /// Stores a plan, assigning a fresh id when it has none. Returns the stored id.
    pub async fn insert_plan(&self, plan: &WorkoutPlan) -> Result<String> {
        let mut record = plan.clone();
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let equipment = serde_json::to_string(&record.equipment_needed)
            .context("failed to encode equipment_needed")?;
        let workouts =
            serde_json::to_string(&record.workouts).context("failed to encode workouts")?;

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO workout_plans (id, name, description, goal, duration_weeks, workouts_per_week, difficulty_level, equipment_needed, status, ai_generated, workouts, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.id,
                    record.name,
                    record.description,
                    record.goal,
                    record.duration_weeks,
                    record.workouts_per_week,
                    record.difficulty_level,
                    equipment,
                    record.status.as_str(),
                    record.ai_generated,
                    workouts,
                    record.created_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert workout plan {}", record.id))?;
            Ok(record.id)
        })
        .await
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<WorkoutPlan>> {
        let plan_id = plan_id.to_string();
        self.execute(move |conn| {
            let sql = format!("SELECT {PLAN_COLUMNS} FROM workout_plans WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row(params![plan_id], |row| Ok(row_to_plan(row)))
                .optional()?;
            row.transpose()
        })
        .await
    }

    /// The most recently created plan marked active.
    pub async fn get_active_plan(&self) -> Result<Option<WorkoutPlan>> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {PLAN_COLUMNS} FROM workout_plans
                 WHERE status = 'active'
                 ORDER BY created_at DESC
                 LIMIT 1"
            );
            Ok(query_plans(conn, &sql)?.into_iter().next())
        })
        .await
    }

    pub async fn list_plans(&self) -> Result<Vec<WorkoutPlan>> {
        self.execute(|conn| {
            let sql = format!("SELECT {PLAN_COLUMNS} FROM workout_plans ORDER BY created_at DESC");
            query_plans(conn, &sql)
        })
        .await
    }

    pub async fn set_plan_status(&self, plan_id: &str, status: PlanStatus) -> Result<()> {
        let plan_id = plan_id.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE workout_plans
                 SET status = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![status.as_str(), Utc::now().to_rfc3339(), plan_id],
            )?;
            if updated == 0 {
                bail!("workout plan {plan_id} does not exist");
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl PlanSource for Database {
    async fn active_plan(&self) -> Result<Option<WorkoutPlan>> {
        self.get_active_plan().await
    }

    /// Plans first, then collections under the same id.
    async fn plan_by_id(&self, id: &str) -> Result<Option<WorkoutPlan>> {
        match self.get_plan(id).await? {
            Some(plan) => Ok(Some(plan)),
            None => self.get_collection_plan(id).await,
        }
    }
}
