//! Workout plan generation.
//!
//! A [`PlanRequest`] captures what the user asked for; a [`PlanGenerator`] turns it into
//! either a multi-week plan or a single workout. The bundled [`MockPlanGenerator`] always
//! answers with the same two-workout program, which doubles as the seed plan for new
//! installations.

mod accept;

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{Exercise, PlanStatus, Workout, WorkoutPlan};

pub use accept::{accept_generated, AcceptedPlan};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Single,
    #[default]
    Plan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutLocation {
    FullGym,
    HomeGym,
    BodyweightHome,
    Outdoor,
    HotelTravel,
    #[serde(other)]
    Other,
}

impl WorkoutLocation {
    /// Environment description handed to the generator.
    pub fn context(&self) -> &'static str {
        match self {
            WorkoutLocation::FullGym => "The user has access to a fully equipped commercial gym with machines, free weights, cardio equipment, and ample space.",
            WorkoutLocation::HomeGym => "The user has a personal home gym setup with selected equipment.",
            WorkoutLocation::BodyweightHome => "The user is working out at home with minimal equipment and limited space.",
            WorkoutLocation::Outdoor => "The user prefers outdoor workouts in parks, trails, or open spaces.",
            WorkoutLocation::HotelTravel => "The user needs quiet, compact workouts for small hotel rooms or travel.",
            WorkoutLocation::Other => "Standard workout environment.",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanRequest {
    pub plan_type: PlanType,
    pub goal: String,
    pub fitness_level: String,
    pub workout_location: WorkoutLocation,
    /// Workouts per week.
    pub available_days: u32,
    /// Minutes per session.
    pub session_duration: u32,
    /// Weeks in the plan.
    pub plan_duration: u32,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub limitations: Option<String>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

impl PlanRequest {
    /// A request with the planner form's starting values: three 45-minute sessions a
    /// week for four weeks.
    pub fn new(plan_type: PlanType, goal: impl Into<String>) -> Self {
        Self {
            plan_type,
            goal: goal.into(),
            fitness_level: "beginner".into(),
            workout_location: WorkoutLocation::Other,
            available_days: 3,
            session_duration: 45,
            plan_duration: 4,
            equipment: Vec::new(),
            focus_areas: Vec::new(),
            limitations: None,
            custom_prompt: None,
        }
    }

    /// Renders the request as a prompt for a text generator.
    pub fn prompt(&self) -> String {
        let joined_or = |items: &[String], fallback: &str| {
            if items.is_empty() {
                fallback.to_string()
            } else {
                items.join(", ")
            }
        };

        let mut lines = vec![
            match self.plan_type {
                PlanType::Single => "Create a personalized single workout.".to_string(),
                PlanType::Plan => format!(
                    "Create a personalized {}-week workout plan with {} workouts per week.",
                    self.plan_duration, self.available_days
                ),
            },
            format!(
                "Goals: {}",
                self.custom_prompt
                    .as_deref()
                    .unwrap_or("No specific description provided.")
            ),
            format!("Environment: {}", self.workout_location.context()),
            format!("Primary goal: {}", self.goal),
            format!("Fitness level: {}", self.fitness_level),
            format!("Session duration: {} minutes", self.session_duration),
            format!("Equipment: {}", joined_or(&self.equipment, "Basic/None")),
            format!("Focus areas: {}", joined_or(&self.focus_areas, "Full body")),
            format!(
                "Limitations: {}",
                self.limitations.as_deref().unwrap_or("None specified")
            ),
        ];
        if self.plan_type == PlanType::Plan {
            lines.insert(
                5,
                format!("Available days: {} per week", self.available_days),
            );
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedPlan {
    Plan(WorkoutPlan),
    Workout(Workout),
}

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, request: &PlanRequest) -> Result<GeneratedPlan>;
}

/// Marks a generated plan as the user's active, AI-generated plan.
pub fn activate(mut plan: WorkoutPlan) -> WorkoutPlan {
    plan.status = PlanStatus::Active;
    plan.ai_generated = true;
    plan
}

/// Offline generator with a fixed answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockPlanGenerator;

impl MockPlanGenerator {
    pub fn sample_plan() -> WorkoutPlan {
        WorkoutPlan {
            id: String::new(),
            name: "Mock Plan".into(),
            description: "This is a mock AI-generated plan.".into(),
            goal: "strength".into(),
            duration_weeks: 4,
            workouts_per_week: 3,
            difficulty_level: "beginner".into(),
            equipment_needed: vec!["dumbbells".into(), "resistance bands".into()],
            status: PlanStatus::Draft,
            ai_generated: false,
            workouts: vec![
                Workout {
                    name: "Upper Body Focus".into(),
                    day: Some("Monday".into()),
                    exercises: vec![
                        exercise(
                            "Push-ups",
                            "8-12",
                            60,
                            "Keep your body in a straight line",
                            &["chest", "triceps", "shoulders"],
                        ),
                        exercise(
                            "Dumbbell Rows",
                            "10-12",
                            60,
                            "Keep your back straight",
                            &["back", "biceps"],
                        ),
                    ],
                },
                Workout {
                    name: "Lower Body Focus".into(),
                    day: Some("Wednesday".into()),
                    exercises: vec![exercise(
                        "Squats",
                        "12-15",
                        90,
                        "Keep your knees behind your toes",
                        &["quadriceps", "glutes"],
                    )],
                },
            ],
            created_at: Utc::now(),
        }
    }
}

fn exercise(
    name: &str,
    reps: &str,
    rest_seconds: u32,
    instructions: &str,
    muscles: &[&str],
) -> Exercise {
    Exercise {
        instructions: Some(instructions.to_string()),
        muscle_groups: muscles.iter().map(|m| m.to_string()).collect::<BTreeSet<_>>(),
        ..Exercise::new(name, 3, reps).with_rest(rest_seconds)
    }
}

#[async_trait]
impl PlanGenerator for MockPlanGenerator {
    async fn generate(&self, request: &PlanRequest) -> Result<GeneratedPlan> {
        let mut plan = Self::sample_plan();
        plan.goal = request.goal.clone();
        plan.difficulty_level = request.fitness_level.clone();

        match request.plan_type {
            PlanType::Plan => Ok(GeneratedPlan::Plan(plan)),
            PlanType::Single => {
                let workout = plan
                    .workouts
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("sample plan has no workouts"))?;
                Ok(GeneratedPlan::Workout(workout))
            }
        }
    }
}
