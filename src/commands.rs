use std::{fmt::Write as _, str::FromStr};

use anyhow::Result;
use chrono::Local;
use thiserror::Error;

use crate::{
    db::Database,
    models::{CollectionWorkout, WorkoutCollection, WorkoutPlan, WorkoutSession},
    planner::{accept_generated, AcceptedPlan, MockPlanGenerator, PlanGenerator, PlanRequest, PlanType},
    stats::summarize,
    timer::{
        format::{format_countdown, format_duration_minutes, format_elapsed},
        RestState,
    },
    workout::{resolve_selection, RecordStatus, Selection, SessionSnapshot, SetEntry, WorkoutHandle},
};

const HISTORY_LIMIT: usize = 10;
const STATS_WINDOW: usize = 50;
const DEFAULT_GOAL: &str = "general_fitness";

pub const HELP: &str = "\
commands:
  plans                     list stored plans
  collections               list collections and their workouts
  collection new <name>     create a collection
  collection rename <id> <name>
  collection add <id> <workout>
                            copy a workout from the selected plan into a collection
  collection remove <workout id>
  collection delete <id>    delete a collection and all of its workouts
  open <plan or collection id>
                            choose workouts from a specific plan or collection
  generate [plan|single] [goal]
                            generate and save a plan, or a single workout in a new collection
  select [workout]          choose from the selected (or active) plan, or start a workout
  start <workout>           start a workout from the selected plan
  reps <set> <value>        record reps for a set (1-based)
  weight <value>            record the weight used
  notes <text>              attach notes to the exercise
  done [reps]               complete the current set
  skip                      skip the rest of the exercise
  pause                     pause or resume the workout
  rest pause|reset|skip     control the rest countdown
  end | confirm | cancel    end the workout early
  retry                     retry saving a session that failed to save
  status | history | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestAction {
    Toggle,
    Reset,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionAction {
    List,
    Create(String),
    Rename { id: String, name: String },
    Add { id: String, workout: String },
    Remove(String),
    Delete(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Plans,
    Collection(CollectionAction),
    Open(String),
    Generate {
        plan_type: PlanType,
        goal: Option<String>,
    },
    Select(Option<String>),
    Start(String),
    Reps { set_index: usize, value: String },
    Weight(String),
    Notes(String),
    Done(Option<String>),
    Skip,
    Pause,
    Rest(RestAction),
    End,
    Confirm,
    Cancel,
    Retry,
    Status,
    History,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("type a command, or `help` for the list")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` needs {what}")]
    Missing {
        command: &'static str,
        what: &'static str,
    },
    #[error("set number must be a positive integer, got `{0}`")]
    BadSetNumber(String),
}

fn required(rest: &str, command: &'static str, what: &'static str) -> Result<String, ParseError> {
    if rest.is_empty() {
        Err(ParseError::Missing { command, what })
    } else {
        Ok(rest.to_string())
    }
}

fn optional(rest: &str) -> Option<String> {
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Splits off the first word of `rest`; both halves must be present.
fn id_and_text(
    rest: &str,
    command: &'static str,
    what: &'static str,
) -> Result<(String, String), ParseError> {
    match rest.split_once(char::is_whitespace) {
        Some((id, text)) if !text.trim().is_empty() => Ok((id.to_string(), text.trim().to_string())),
        _ => Err(ParseError::Missing { command, what }),
    }
}

fn parse_collection(rest: &str) -> Result<CollectionAction, ParseError> {
    let (action, rest) = match rest.split_once(char::is_whitespace) {
        Some((action, rest)) => (action, rest.trim()),
        None => (rest, ""),
    };
    match action.to_ascii_lowercase().as_str() {
        "" | "list" => Ok(CollectionAction::List),
        "new" => required(rest, "collection new", "a name").map(CollectionAction::Create),
        "rename" => id_and_text(rest, "collection rename", "an id and a new name")
            .map(|(id, name)| CollectionAction::Rename { id, name }),
        "add" => id_and_text(rest, "collection add", "a collection id and a workout name")
            .map(|(id, workout)| CollectionAction::Add { id, workout }),
        "remove" => required(rest, "collection remove", "a workout id").map(CollectionAction::Remove),
        "delete" => required(rest, "collection delete", "an id").map(CollectionAction::Delete),
        _ => Err(ParseError::Missing {
            command: "collection",
            what: "one of new, rename, add, remove or delete",
        }),
    }
}

fn parse_generate(rest: &str) -> ConsoleCommand {
    let (first, tail) = match rest.split_once(char::is_whitespace) {
        Some((first, tail)) => (first, tail.trim()),
        None => (rest, ""),
    };
    match first.to_ascii_lowercase().as_str() {
        "single" | "workout" => ConsoleCommand::Generate {
            plan_type: PlanType::Single,
            goal: optional(tail),
        },
        "plan" => ConsoleCommand::Generate {
            plan_type: PlanType::Plan,
            goal: optional(tail),
        },
        _ => ConsoleCommand::Generate {
            plan_type: PlanType::Plan,
            goal: optional(rest),
        },
    }
}

impl FromStr for ConsoleCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "plans" => Ok(ConsoleCommand::Plans),
            "collections" => Ok(ConsoleCommand::Collection(CollectionAction::List)),
            "collection" => parse_collection(rest).map(ConsoleCommand::Collection),
            "open" => required(rest, "open", "a plan or collection id").map(ConsoleCommand::Open),
            "generate" => Ok(parse_generate(rest)),
            "select" => Ok(ConsoleCommand::Select(optional(rest))),
            "start" => required(rest, "start", "a workout name").map(ConsoleCommand::Start),
            "reps" => {
                let (set, value) = rest.split_once(char::is_whitespace).ok_or(
                    ParseError::Missing {
                        command: "reps",
                        what: "a set number and a value",
                    },
                )?;
                let set_number: usize = set
                    .parse()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ParseError::BadSetNumber(set.to_string()))?;
                Ok(ConsoleCommand::Reps {
                    set_index: set_number - 1,
                    value: value.trim().to_string(),
                })
            }
            "weight" => required(rest, "weight", "a value").map(ConsoleCommand::Weight),
            "notes" => Ok(ConsoleCommand::Notes(rest.to_string())),
            "done" => Ok(ConsoleCommand::Done(optional(rest))),
            "skip" => Ok(ConsoleCommand::Skip),
            "pause" | "resume" => Ok(ConsoleCommand::Pause),
            "rest" => match rest {
                "pause" | "resume" => Ok(ConsoleCommand::Rest(RestAction::Toggle)),
                "reset" => Ok(ConsoleCommand::Rest(RestAction::Reset)),
                "skip" => Ok(ConsoleCommand::Rest(RestAction::Skip)),
                _ => Err(ParseError::Missing {
                    command: "rest",
                    what: "one of pause, reset or skip",
                }),
            },
            "end" => Ok(ConsoleCommand::End),
            "confirm" => Ok(ConsoleCommand::Confirm),
            "cancel" => Ok(ConsoleCommand::Cancel),
            "retry" => Ok(ConsoleCommand::Retry),
            "status" => Ok(ConsoleCommand::Status),
            "history" => Ok(ConsoleCommand::History),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

pub enum Flow {
    Continue(String),
    Quit,
}

/// Connects parsed commands to the workout runtime and the plan store.
pub struct Console {
    handle: WorkoutHandle,
    db: Database,
    generator: Box<dyn PlanGenerator>,
    selection: Selection,
}

impl Console {
    pub fn new(handle: WorkoutHandle, db: Database) -> Self {
        Self::with_generator(handle, db, Box::new(MockPlanGenerator))
    }

    pub fn with_generator(
        handle: WorkoutHandle,
        db: Database,
        generator: Box<dyn PlanGenerator>,
    ) -> Self {
        Self {
            handle,
            db,
            generator,
            selection: Selection::Unavailable,
        }
    }

    /// Runs one command. Session errors become output; only store failures propagate.
    pub async fn execute(&mut self, command: ConsoleCommand) -> Result<Flow> {
        let outcome = match command {
            ConsoleCommand::Quit => return Ok(Flow::Quit),
            ConsoleCommand::Help => return Ok(Flow::Continue(HELP.to_string())),
            ConsoleCommand::Plans => return self.list_plans().await.map(Flow::Continue),
            ConsoleCommand::Collection(action) => {
                return self.collection(action).await.map(Flow::Continue)
            }
            ConsoleCommand::Open(id) => return Ok(Flow::Continue(self.open(&id).await)),
            ConsoleCommand::Generate { plan_type, goal } => {
                return self.generate(plan_type, goal).await.map(Flow::Continue)
            }
            ConsoleCommand::History => return self.history().await.map(Flow::Continue),
            ConsoleCommand::Select(name) => return Ok(Flow::Continue(self.select(name).await)),
            ConsoleCommand::Start(name) => return Ok(Flow::Continue(self.start(&name).await)),
            ConsoleCommand::Reps { set_index, value } => self.handle.record_rep(set_index, value).await,
            ConsoleCommand::Weight(value) => self.handle.set_weight(value).await,
            ConsoleCommand::Notes(text) => self.handle.set_notes(text).await,
            ConsoleCommand::Done(reps) => {
                self.handle
                    .complete_set(SetEntry {
                        reps,
                        ..SetEntry::default()
                    })
                    .await
            }
            ConsoleCommand::Skip => self.handle.skip_exercise().await,
            ConsoleCommand::Pause => self.handle.toggle_pause().await,
            ConsoleCommand::Rest(RestAction::Toggle) => self.handle.toggle_rest().await,
            ConsoleCommand::Rest(RestAction::Reset) => self.handle.reset_rest().await,
            ConsoleCommand::Rest(RestAction::Skip) => self.handle.skip_rest().await,
            ConsoleCommand::End => self.handle.request_end().await,
            ConsoleCommand::Confirm => self.handle.confirm_end().await,
            ConsoleCommand::Cancel => self.handle.cancel_end().await,
            ConsoleCommand::Retry => self.handle.retry_record().await,
            ConsoleCommand::Status => self.handle.snapshot().await,
        };

        Ok(Flow::Continue(match outcome {
            Ok(snapshot) => describe(&snapshot),
            Err(err) => format!("error: {err}"),
        }))
    }

    async fn list_plans(&self) -> Result<String> {
        let plans = self.db.list_plans().await?;
        if plans.is_empty() {
            return Ok("no plans stored".to_string());
        }
        let mut out = String::new();
        for plan in plans {
            let _ = writeln!(out, "{} [{}] {}", plan.name, plan.status.as_str(), plan.id);
            for workout in &plan.workouts {
                let day = workout.day.as_deref().unwrap_or("any day");
                let _ = writeln!(
                    out,
                    "  - {} ({day}, {} exercises)",
                    workout.name,
                    workout.exercises.len()
                );
            }
        }
        Ok(out.trim_end().to_string())
    }

    async fn select(&mut self, name: Option<String>) -> String {
        let plan_id = self.selection.plan().map(|plan| plan.id.clone());
        self.selection =
            resolve_selection(&self.db, plan_id.as_deref(), name.as_deref()).await;

        match &self.selection {
            Selection::Start { workout, .. } => {
                let name = workout.name.clone();
                self.start(&name).await
            }
            Selection::Choose { plan } => choices(plan),
            Selection::Unavailable => "no workout available".to_string(),
        }
    }

    async fn open(&mut self, id: &str) -> String {
        self.selection = resolve_selection(&self.db, Some(id), None).await;
        match self.selection.plan() {
            Some(plan) => choices(plan),
            None => format!("no plan or collection {id}"),
        }
    }

    /// Reloads the selected plan or collection after it was edited.
    async fn refresh_selection(&mut self) {
        if let Some(id) = self.selection.plan().map(|plan| plan.id.clone()) {
            self.selection = resolve_selection(&self.db, Some(&id), None).await;
        }
    }

    async fn collection(&mut self, action: CollectionAction) -> Result<String> {
        let output = match action {
            CollectionAction::List => return self.list_collections().await,
            CollectionAction::Create(name) => {
                let collection = WorkoutCollection::new(name, "");
                let id = self.db.insert_collection(&collection).await?;
                format!("created collection {} {id}", collection.name)
            }
            CollectionAction::Rename { id, name } => {
                let Some(collection) = self.db.get_collection(&id).await? else {
                    return Ok(format!("no collection {id}"));
                };
                self.db
                    .update_collection(&id, &name, &collection.description)
                    .await?;
                format!("renamed {} to {name}", collection.name)
            }
            CollectionAction::Add { id, workout } => {
                if self.selection.plan().is_none() {
                    self.selection = resolve_selection(&self.db, None, None).await;
                }
                let workout = match self.selection.workout(&workout) {
                    Ok((_, workout)) => workout.clone(),
                    Err(err) => return Ok(format!("error: {err}")),
                };
                let Some(collection) = self.db.get_collection(&id).await? else {
                    return Ok(format!("no collection {id}"));
                };
                let stored = CollectionWorkout::new(collection.id.clone(), workout);
                let workout_id = self.db.insert_collection_workout(&stored).await?;
                format!(
                    "added {} to {} ({workout_id})",
                    stored.workout.name, collection.name
                )
            }
            CollectionAction::Remove(workout_id) => {
                if self.db.delete_collection_workout(&workout_id).await? {
                    format!("removed workout {workout_id}")
                } else {
                    format!("no workout {workout_id}")
                }
            }
            CollectionAction::Delete(id) => {
                let Some(collection) = self.db.get_collection(&id).await? else {
                    return Ok(format!("no collection {id}"));
                };
                let workouts = self.db.delete_collection(&id).await?;
                format!("deleted {} and {workouts} workout(s)", collection.name)
            }
        };
        self.refresh_selection().await;
        Ok(output)
    }

    async fn list_collections(&self) -> Result<String> {
        let collections = self.db.list_collections().await?;
        if collections.is_empty() {
            return Ok("no collections stored".to_string());
        }
        let mut out = String::new();
        for collection in collections {
            let _ = writeln!(out, "{} {}", collection.name, collection.id);
            if !collection.description.is_empty() {
                let _ = writeln!(out, "  {}", collection.description);
            }
            for stored in self.db.list_collection_workouts(&collection.id).await? {
                let _ = writeln!(
                    out,
                    "  - {} ({} exercises) {}",
                    stored.workout.name,
                    stored.workout.exercises.len(),
                    stored.id
                );
            }
        }
        Ok(out.trim_end().to_string())
    }

    async fn generate(&mut self, plan_type: PlanType, goal: Option<String>) -> Result<String> {
        let request = PlanRequest::new(plan_type, goal.unwrap_or_else(|| DEFAULT_GOAL.to_string()));
        log::debug!("Generating from prompt:\n{}", request.prompt());
        let generated = self.generator.generate(&request).await?;
        let accepted = accept_generated(&self.db, generated).await?;

        let saved = match &accepted {
            AcceptedPlan::Plan(plan) => format!("saved plan {} {} (now active)", plan.name, plan.id),
            AcceptedPlan::Collection {
                collection,
                workout,
            } => format!(
                "saved {} in {} {}",
                workout.workout.name, collection.name, collection.id
            ),
        };
        self.selection = resolve_selection(&self.db, Some(accepted.source_id()), None).await;
        Ok(match self.selection.plan() {
            Some(plan) => format!("{saved}\n{}", choices(plan)),
            None => saved,
        })
    }

    async fn start(&mut self, name: &str) -> String {
        if self.selection.plan().is_none() {
            self.selection = resolve_selection(&self.db, None, None).await;
        }
        let (plan_id, workout) = match self.selection.workout(name) {
            Ok((plan, workout)) => (plan.id.clone(), workout.clone()),
            Err(err) => return format!("error: {err}"),
        };

        if self.handle.latest().phase.is_terminal() {
            if let Err(err) = self.handle.dismiss().await {
                return format!("error: {err}");
            }
        }
        match self.handle.start(workout, Some(plan_id)).await {
            Ok(snapshot) => describe(&snapshot),
            Err(err) => format!("error: {err}"),
        }
    }

    async fn history(&self) -> Result<String> {
        let sessions = self.db.list_workout_sessions(STATS_WINDOW).await?;
        let summary = summarize(&sessions, &Local::now());

        let mut out = format!(
            "{} workouts, {}, streak {} day(s)\n",
            summary.total_workouts,
            format_duration_minutes(summary.total_minutes),
            summary.current_streak
        );
        for session in sessions.iter().take(HISTORY_LIMIT) {
            let _ = writeln!(out, "{}", history_line(session));
        }
        Ok(out.trim_end().to_string())
    }
}

fn choices(plan: &WorkoutPlan) -> String {
    if plan.workouts.is_empty() {
        return format!("{}: no workouts yet", plan.name);
    }
    let names: Vec<&str> = plan.workouts.iter().map(|w| w.name.as_str()).collect();
    format!("{}: choose one of {}", plan.name, names.join(", "))
}

fn history_line(session: &WorkoutSession) -> String {
    format!(
        "{}  {}  {}  {}",
        session.start_time.with_timezone(&Local).format("%b %-d %H:%M"),
        session.workout_name,
        session.status.as_str(),
        session
            .duration_minutes
            .map(format_duration_minutes)
            .unwrap_or_else(|| "-".to_string())
    )
}

/// One-screen rendering of the session state.
pub fn describe(snapshot: &SessionSnapshot) -> String {
    let Some(name) = snapshot.workout_name.as_deref() else {
        return format!("{}", snapshot.phase);
    };

    let mut out = format!(
        "{name} ({}) {}",
        snapshot.phase,
        format_elapsed(snapshot.elapsed_seconds)
    );

    if snapshot.phase.is_terminal() {
        let record = match &snapshot.record {
            RecordStatus::Recorded => "saved".to_string(),
            RecordStatus::Failed(reason) => format!("not saved: {reason} (type `retry`)"),
            _ => "saving".to_string(),
        };
        let _ = write!(out, "\nsession {record}");
        return out;
    }

    if let Some(exercise) = &snapshot.current_exercise {
        let _ = write!(
            out,
            "\nexercise {}/{}: {} set {}/{} x {}",
            snapshot.exercise_index + 1,
            snapshot.total_exercises,
            exercise.name,
            snapshot.set_number,
            exercise.sets,
            exercise.reps
        );
    }
    match snapshot.rest {
        RestState::Running(left) => {
            let _ = write!(out, "\nresting {}", format_countdown(left));
        }
        RestState::Paused(left) => {
            let _ = write!(out, "\nrest paused at {}", format_countdown(left));
        }
        RestState::Expired if snapshot.current_exercise.is_some() => {
            let _ = write!(out, "\nrest over");
        }
        _ => {}
    }
    if snapshot.end_pending {
        let _ = write!(out, "\nend workout? `confirm` or `cancel`");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Result<ConsoleCommand, ParseError> {
        line.parse()
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse("start Upper Body Focus"),
            Ok(ConsoleCommand::Start("Upper Body Focus".into()))
        );
        assert_eq!(
            parse("  reps 2   10 "),
            Ok(ConsoleCommand::Reps {
                set_index: 1,
                value: "10".into()
            })
        );
        assert_eq!(parse("select"), Ok(ConsoleCommand::Select(None)));
        assert_eq!(parse("done 12"), Ok(ConsoleCommand::Done(Some("12".into()))));
        assert_eq!(parse("REST skip"), Ok(ConsoleCommand::Rest(RestAction::Skip)));
        assert_eq!(parse("notes"), Ok(ConsoleCommand::Notes(String::new())));
    }

    #[test]
    fn parses_collection_and_generate_commands() {
        assert_eq!(
            parse("collections"),
            Ok(ConsoleCommand::Collection(CollectionAction::List))
        );
        assert_eq!(
            parse("collection new Hotel Workouts"),
            Ok(ConsoleCommand::Collection(CollectionAction::Create(
                "Hotel Workouts".into()
            )))
        );
        assert_eq!(
            parse("collection add c-1 Upper Body Focus"),
            Ok(ConsoleCommand::Collection(CollectionAction::Add {
                id: "c-1".into(),
                workout: "Upper Body Focus".into()
            }))
        );
        assert_eq!(
            parse("collection DELETE c-1"),
            Ok(ConsoleCommand::Collection(CollectionAction::Delete("c-1".into())))
        );
        assert_eq!(parse("open c-1"), Ok(ConsoleCommand::Open("c-1".into())));
        assert_eq!(
            parse("generate single fat loss"),
            Ok(ConsoleCommand::Generate {
                plan_type: PlanType::Single,
                goal: Some("fat loss".into())
            })
        );
        assert_eq!(
            parse("generate"),
            Ok(ConsoleCommand::Generate {
                plan_type: PlanType::Plan,
                goal: None
            })
        );
        assert_eq!(
            parse("generate strength"),
            Ok(ConsoleCommand::Generate {
                plan_type: PlanType::Plan,
                goal: Some("strength".into())
            })
        );
        assert!(matches!(parse("collection rename c-1"), Err(ParseError::Missing { .. })));
        assert!(matches!(parse("collection shuffle"), Err(ParseError::Missing { .. })));
        assert!(matches!(parse("open"), Err(ParseError::Missing { .. })));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("jump"), Err(ParseError::Unknown("jump".into())));
        assert_eq!(parse("reps 0 10"), Err(ParseError::BadSetNumber("0".into())));
        assert!(matches!(parse("reps 3"), Err(ParseError::Missing { .. })));
        assert!(matches!(parse("start"), Err(ParseError::Missing { .. })));
        assert!(matches!(parse("rest later"), Err(ParseError::Missing { .. })));
    }

    #[test]
    fn describes_idle_and_terminal_snapshots() {
        let idle = SessionSnapshot::default();
        assert_eq!(describe(&idle), "selecting a workout");

        let done = SessionSnapshot {
            phase: crate::workout::SessionPhase::Completed,
            workout_name: Some("Upper".into()),
            elapsed_seconds: 125,
            record: RecordStatus::Failed("disk full".into()),
            ..SessionSnapshot::default()
        };
        assert_eq!(
            describe(&done),
            "Upper (completed) 2:05\nsession not saved: disk full (type `retry`)"
        );
    }
}
