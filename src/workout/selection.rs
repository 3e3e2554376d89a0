use anyhow::Result;
use async_trait::async_trait;
use log::{error, info};

use crate::models::{Workout, WorkoutPlan};

use super::error::SessionError;

/// Where plans come from: the local database, a fixture, or a remote catalogue.
#[async_trait]
pub trait PlanSource: Send + Sync {
    async fn active_plan(&self) -> Result<Option<WorkoutPlan>>;
    async fn plan_by_id(&self, id: &str) -> Result<Option<WorkoutPlan>>;
}

/// Outcome of resolving what the user asked to train.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A specific workout was requested and found; start it right away.
    Start { plan: WorkoutPlan, workout: Workout },
    /// A plan is available; the user picks one of its workouts.
    Choose { plan: WorkoutPlan },
    /// Nothing to train: no plan matched and no active plan exists.
    Unavailable,
}

impl Selection {
    pub fn plan(&self) -> Option<&WorkoutPlan> {
        match self {
            Selection::Start { plan, .. } | Selection::Choose { plan } => Some(plan),
            Selection::Unavailable => None,
        }
    }

    /// Picks a workout by name from the resolved plan.
    pub fn workout(&self, name: &str) -> Result<(&WorkoutPlan, &Workout), SessionError> {
        let plan = self.plan().ok_or_else(|| SessionError::WorkoutNotFound {
            name: name.to_string(),
        })?;
        let workout = plan
            .find_workout(name)
            .ok_or_else(|| SessionError::WorkoutNotFound {
                name: name.to_string(),
            })?;
        Ok((plan, workout))
    }
}

/// Resolves a plan id and workout name into something the user can train.
///
/// Lookup failures never propagate: they are logged and the caller ends up with
/// [`Selection::Unavailable`] so the UI can show "no workout available".
pub async fn resolve_selection(
    source: &dyn PlanSource,
    plan_id: Option<&str>,
    workout_name: Option<&str>,
) -> Selection {
    match (plan_id, workout_name) {
        (Some(id), Some(name)) => match lookup_plan(source, id).await {
            Ok(plan) => match plan.find_workout(name).cloned() {
                Some(workout) => Selection::Start { plan, workout },
                None => {
                    info!("{}", SessionError::WorkoutNotFound { name: name.to_string() });
                    Selection::Choose { plan }
                }
            },
            Err(err) => {
                info!("{err}; falling back to the active plan");
                active_selection(source).await
            }
        },
        (Some(id), None) => match lookup_plan(source, id).await {
            Ok(plan) => Selection::Choose { plan },
            Err(err) => {
                info!("{err}");
                Selection::Unavailable
            }
        },
        (None, _) => active_selection(source).await,
    }
}

async fn lookup_plan(source: &dyn PlanSource, id: &str) -> Result<WorkoutPlan, SessionError> {
    let not_found = || SessionError::PlanNotFound { id: id.to_string() };
    match source.plan_by_id(id).await {
        Ok(Some(plan)) => Ok(plan),
        Ok(None) => Err(not_found()),
        Err(err) => {
            error!("Error loading plan {id}: {err:#}");
            Err(not_found())
        }
    }
}

async fn active_selection(source: &dyn PlanSource) -> Selection {
    match source.active_plan().await {
        Ok(Some(plan)) => Selection::Choose { plan },
        Ok(None) => Selection::Unavailable,
        Err(err) => {
            error!("Error loading active plan: {err:#}");
            Selection::Unavailable
        }
    }
}
