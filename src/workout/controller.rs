use std::{fmt, time::Duration};

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::{duration_minutes, Exercise, ExerciseResult, SessionStatus, Workout, WorkoutSession},
    timer::{Clock, ClockId, ElapsedTimer, ManualClock, RestState, RestTimer, Tick},
};

use super::{
    error::SessionError,
    tracker::{ExerciseTracker, TrackerSnapshot},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Selecting,
    InProgress,
    Paused,
    Completed,
    Incomplete,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Incomplete)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Selecting => "selecting a workout",
            SessionPhase::InProgress => "in progress",
            SessionPhase::Paused => "paused",
            SessionPhase::Completed => "completed",
            SessionPhase::Incomplete => "ended early",
        };
        f.write_str(label)
    }
}

/// Where the finished session is in its hand-off to the recorder.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(tag = "state", content = "reason", rename_all = "camelCase")]
pub enum RecordStatus {
    #[default]
    NotStarted,
    Pending,
    Recording,
    Recorded,
    Failed(String),
}

/// Data entered for the set being completed. Absent fields leave the tracker untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SetEntry {
    #[serde(default)]
    pub reps: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Elapsed(u64),
    Rest(u32),
    RestExpired,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub workout_name: Option<String>,
    pub exercise_index: usize,
    pub total_exercises: usize,
    pub set_number: u32,
    pub current_exercise: Option<Exercise>,
    pub resting: bool,
    pub rest: RestState,
    pub elapsed_seconds: u64,
    pub end_pending: bool,
    pub tracker: Option<TrackerSnapshot>,
    pub session: Option<WorkoutSession>,
    pub record: RecordStatus,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Selecting,
            workout_name: None,
            exercise_index: 0,
            total_exercises: 0,
            set_number: 0,
            current_exercise: None,
            resting: false,
            rest: RestState::Idle,
            elapsed_seconds: 0,
            end_pending: false,
            tracker: None,
            session: None,
            record: RecordStatus::NotStarted,
        }
    }
}

/// Drives one workout attempt from selection to a terminal outcome.
///
/// The controller is the only owner of session, tracker and timer state. Hosts feed
/// it user commands and clock ticks; when it reaches a terminal phase it stages the
/// session for exactly one hand-off through [`SessionController::take_pending_record`].
pub struct SessionController<C: Clock> {
    phase: SessionPhase,
    workout: Option<Workout>,
    session: Option<WorkoutSession>,
    exercise_index: usize,
    set_number: u32,
    tracker: ExerciseTracker,
    rest: RestTimer<C>,
    elapsed: ElapsedTimer<C>,
    end_pending: bool,
    record: RecordStatus,
}

impl SessionController<ManualClock> {
    pub fn manual(tick_interval: Duration) -> Self {
        Self::new(
            ManualClock::new(ClockId::Elapsed),
            ManualClock::new(ClockId::Rest),
            tick_interval,
        )
    }
}

impl<C: Clock> SessionController<C> {
    pub fn new(elapsed_clock: C, rest_clock: C, tick_interval: Duration) -> Self {
        Self {
            phase: SessionPhase::Selecting,
            workout: None,
            session: None,
            exercise_index: 0,
            set_number: 0,
            tracker: ExerciseTracker::new(),
            rest: RestTimer::new(rest_clock, tick_interval),
            elapsed: ElapsedTimer::new(elapsed_clock, tick_interval),
            end_pending: false,
            record: RecordStatus::NotStarted,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn set_number(&self) -> u32 {
        self.set_number
    }

    pub fn is_resting(&self) -> bool {
        self.rest.state().is_active()
    }

    pub fn is_end_pending(&self) -> bool {
        self.end_pending
    }

    pub fn rest_timer(&self) -> &RestTimer<C> {
        &self.rest
    }

    pub fn elapsed(&self) -> &ElapsedTimer<C> {
        &self.elapsed
    }

    pub fn tracker(&self) -> &ExerciseTracker {
        &self.tracker
    }

    pub fn session(&self) -> Option<&WorkoutSession> {
        self.session.as_ref()
    }

    pub fn record_status(&self) -> &RecordStatus {
        &self.record
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        if self.phase.is_terminal() {
            return None;
        }
        self.workout
            .as_ref()
            .and_then(|workout| workout.exercises.get(self.exercise_index))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let exercise_active = matches!(self.phase, SessionPhase::InProgress | SessionPhase::Paused);
        SessionSnapshot {
            phase: self.phase,
            workout_name: self.workout.as_ref().map(|w| w.name.clone()),
            exercise_index: self.exercise_index,
            total_exercises: self.workout.as_ref().map_or(0, |w| w.exercises.len()),
            set_number: self.set_number,
            current_exercise: self.current_exercise().cloned(),
            resting: self.is_resting(),
            rest: self.rest.state(),
            elapsed_seconds: self.elapsed.seconds(),
            end_pending: self.is_end_pending(),
            tracker: exercise_active.then(|| self.tracker.snapshot()),
            session: self.session.clone(),
            record: self.record.clone(),
        }
    }

    pub fn start(&mut self, workout: Workout, plan_id: Option<String>) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Selecting {
            return Err(SessionError::invalid("start a workout", self.phase));
        }
        let Some(first) = workout.exercises.first() else {
            return Err(SessionError::EmptyWorkout);
        };

        self.tracker.reset(first);
        self.session = Some(WorkoutSession {
            id: Uuid::new_v4().to_string(),
            workout_plan_id: plan_id,
            workout_name: workout.name.clone(),
            start_time: Utc::now(),
            end_time: None,
            duration_minutes: None,
            status: SessionStatus::InProgress,
            exercises_completed: Vec::with_capacity(workout.exercises.len()),
        });
        info!(
            "Starting workout {:?} with {} exercises",
            workout.name,
            workout.exercises.len()
        );

        self.workout = Some(workout);
        self.exercise_index = 0;
        self.set_number = 1;
        self.end_pending = false;
        self.record = RecordStatus::NotStarted;
        self.rest.clear();
        self.elapsed.restart();
        self.phase = SessionPhase::InProgress;
        Ok(())
    }

    /// Back to `Selecting` after a terminal outcome has been handed off.
    pub fn dismiss(&mut self) -> Result<(), SessionError> {
        let handed_off = matches!(self.record, RecordStatus::Recorded | RecordStatus::Failed(_));
        if !self.phase.is_terminal() || !handed_off {
            return Err(SessionError::invalid("dismiss the session", self.phase));
        }
        self.phase = SessionPhase::Selecting;
        self.workout = None;
        self.session = None;
        self.exercise_index = 0;
        self.set_number = 0;
        self.tracker = ExerciseTracker::new();
        self.record = RecordStatus::NotStarted;
        Ok(())
    }

    pub fn record_rep(&mut self, set_index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_session("record reps")?;
        self.tracker.record_rep(set_index, value)
    }

    pub fn set_weight(&mut self, value: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_session("set the weight")?;
        self.tracker.set_weight(value);
        Ok(())
    }

    pub fn set_notes(&mut self, value: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_session("set notes")?;
        self.tracker.set_notes(value);
        Ok(())
    }

    pub fn complete_set(&mut self, entry: SetEntry) -> Result<(), SessionError> {
        self.ensure_active("complete a set")?;
        if self.is_resting() {
            return Err(SessionError::RestInProgress);
        }
        let rest_seconds = match self.current_exercise() {
            Some(exercise) => exercise.rest_seconds,
            None => return Err(SessionError::invalid("complete a set", self.phase)),
        };
        let sets = self.tracker.sets() as u32;

        if let Some(reps) = entry.reps {
            self.tracker
                .record_rep(self.set_number.saturating_sub(1) as usize, reps)?;
        }
        if let Some(weight) = entry.weight {
            self.tracker.set_weight(weight);
        }
        if let Some(notes) = entry.notes {
            self.tracker.set_notes(notes);
        }
        self.tracker.mark_set_completed();

        if self.set_number < sets {
            self.set_number += 1;
            self.rest.start(i64::from(rest_seconds));
            debug!("Set complete, resting {rest_seconds}s before set {}", self.set_number);
        } else {
            self.finish_exercise();
        }
        Ok(())
    }

    pub fn skip_exercise(&mut self) -> Result<(), SessionError> {
        self.ensure_active("skip an exercise")?;
        self.rest.clear();
        self.finish_exercise();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure_active("pause")?;
        self.elapsed.pause();
        self.phase = SessionPhase::Paused;
        info!("Workout paused at {}s", self.elapsed.seconds());
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Paused || self.is_end_pending() {
            return Err(SessionError::invalid("resume", self.phase));
        }
        self.elapsed.resume();
        self.phase = SessionPhase::InProgress;
        info!("Workout resumed");
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<SessionPhase, SessionError> {
        match self.phase {
            SessionPhase::Paused => self.resume()?,
            _ => self.pause()?,
        }
        Ok(self.phase)
    }

    /// Pauses the workout and waits for [`confirm_end`](Self::confirm_end) or
    /// [`cancel_end`](Self::cancel_end). Repeating the request changes nothing.
    pub fn request_end(&mut self) -> Result<(), SessionError> {
        if !matches!(self.phase, SessionPhase::InProgress | SessionPhase::Paused) {
            return Err(SessionError::invalid("end the workout", self.phase));
        }
        if self.end_pending {
            return Ok(());
        }
        self.end_pending = true;
        self.elapsed.pause();
        self.phase = SessionPhase::Paused;
        info!("End of workout requested");
        Ok(())
    }

    pub fn confirm_end(&mut self) -> Result<(), SessionError> {
        if !self.end_pending {
            return Err(SessionError::invalid("confirm ending", self.phase));
        }
        self.push_result();
        self.terminate(SessionStatus::Incomplete);
        Ok(())
    }

    /// Drops a pending end request and carries on with the workout, unpaused.
    pub fn cancel_end(&mut self) -> Result<(), SessionError> {
        if !self.end_pending {
            return Err(SessionError::invalid("cancel ending", self.phase));
        }
        self.end_pending = false;
        self.elapsed.resume();
        self.phase = SessionPhase::InProgress;
        info!("End of workout cancelled");
        Ok(())
    }

    pub fn toggle_rest(&mut self) -> Result<RestState, SessionError> {
        self.ensure_session("pause the rest timer")?;
        Ok(self.rest.toggle())
    }

    pub fn reset_rest(&mut self) -> Result<RestState, SessionError> {
        self.ensure_session("reset the rest timer")?;
        let rest_seconds = self
            .current_exercise()
            .map_or(0, |exercise| exercise.rest_seconds);
        self.rest.reset(i64::from(rest_seconds));
        Ok(self.rest.state())
    }

    pub fn skip_rest(&mut self) -> Result<RestState, SessionError> {
        self.ensure_session("skip the rest")?;
        self.rest.skip();
        Ok(self.rest.state())
    }

    pub fn handle_tick(&mut self, tick: Tick) -> TickOutcome {
        match tick.clock {
            ClockId::Elapsed => {
                if self.elapsed.tick(tick) {
                    TickOutcome::Elapsed(self.elapsed.seconds())
                } else {
                    debug!("Ignoring stale elapsed tick (generation {})", tick.generation);
                    TickOutcome::Ignored
                }
            }
            ClockId::Rest => {
                if !self.rest.clock().accepts(tick) {
                    debug!("Ignoring stale rest tick (generation {})", tick.generation);
                    return TickOutcome::Ignored;
                }
                if self.rest.tick(tick) {
                    info!("Rest period over");
                    TickOutcome::RestExpired
                } else {
                    TickOutcome::Rest(self.rest.remaining())
                }
            }
        }
    }

    /// Hands out the terminal session for recording. Returns `Some` once per
    /// terminal transition (and once per accepted retry).
    pub fn take_pending_record(&mut self) -> Option<WorkoutSession> {
        if self.record != RecordStatus::Pending {
            return None;
        }
        self.record = RecordStatus::Recording;
        self.session.clone()
    }

    pub fn finish_record(&mut self, outcome: Result<(), String>) -> Result<(), SessionError> {
        if self.record != RecordStatus::Recording {
            return Err(SessionError::invalid("finish recording", self.phase));
        }
        match outcome {
            Ok(()) => {
                self.record = RecordStatus::Recorded;
                Ok(())
            }
            Err(reason) => {
                self.record = RecordStatus::Failed(reason.clone());
                Err(SessionError::RecordingFailed { reason })
            }
        }
    }

    pub fn retry_record(&mut self) -> Result<(), SessionError> {
        if !matches!(self.record, RecordStatus::Failed(_)) {
            return Err(SessionError::invalid("retry recording", self.phase));
        }
        self.record = RecordStatus::Pending;
        Ok(())
    }

    fn ensure_active(&self, action: &'static str) -> Result<(), SessionError> {
        if self.phase == SessionPhase::InProgress && !self.end_pending {
            Ok(())
        } else {
            Err(SessionError::invalid(action, self.phase))
        }
    }

    fn ensure_session(&self, action: &'static str) -> Result<(), SessionError> {
        if matches!(self.phase, SessionPhase::InProgress | SessionPhase::Paused) {
            Ok(())
        } else {
            Err(SessionError::invalid(action, self.phase))
        }
    }

    fn push_result(&mut self) {
        let result = ExerciseResult::from(self.tracker.snapshot());
        info!(
            "Exercise {:?} finished with {} sets",
            result.exercise_name, result.sets_completed
        );
        if let Some(session) = self.session.as_mut() {
            session.exercises_completed.push(result);
        }
    }

    fn finish_exercise(&mut self) {
        self.push_result();

        let next = self
            .workout
            .as_ref()
            .and_then(|workout| workout.exercises.get(self.exercise_index + 1))
            .cloned();

        match next {
            Some(exercise) => {
                self.exercise_index += 1;
                self.set_number = 1;
                self.tracker.reset(&exercise);
                self.rest.clear();
            }
            None => self.terminate(SessionStatus::Completed),
        }
    }

    fn terminate(&mut self, status: SessionStatus) {
        let end_time = Utc::now();
        self.elapsed.pause();
        self.rest.clear();
        self.end_pending = false;

        if let Some(session) = self.session.as_mut() {
            session.end_time = Some(end_time);
            session.duration_minutes = Some(duration_minutes(session.start_time, end_time));
            session.status = status;
            info!(
                "Workout {:?} {} after {} min with {} exercises",
                session.workout_name,
                status.as_str(),
                session.duration_minutes.unwrap_or(0),
                session.exercises_completed.len()
            );
        }

        self.phase = match status {
            SessionStatus::Completed => SessionPhase::Completed,
            _ => SessionPhase::Incomplete,
        };
        self.record = RecordStatus::Pending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn controller() -> SessionController<ManualClock> {
        SessionController::manual(Duration::from_secs(1))
    }

    fn workout(exercises: &[(&str, u32, u32)]) -> Workout {
        Workout::new(
            "Test Day",
            exercises
                .iter()
                .map(|(name, sets, rest)| Exercise::new(*name, *sets, "8-12").with_rest(*rest))
                .collect(),
        )
    }

    fn tick_elapsed(ctrl: &mut SessionController<ManualClock>) -> TickOutcome {
        match ctrl.elapsed().clock().pending() {
            Some(tick) => ctrl.handle_tick(tick),
            None => TickOutcome::Ignored,
        }
    }

    fn tick_rest(ctrl: &mut SessionController<ManualClock>) -> TickOutcome {
        match ctrl.rest_timer().clock().pending() {
            Some(tick) => ctrl.handle_tick(tick),
            None => TickOutcome::Ignored,
        }
    }

    #[test]
    fn starting_an_empty_workout_is_rejected() {
        let mut ctrl = controller();
        let err = ctrl.start(Workout::new("Nothing", vec![]), None).unwrap_err();

        assert_eq!(err, SessionError::EmptyWorkout);
        assert_eq!(ctrl.phase(), SessionPhase::Selecting);
        assert!(ctrl.session().is_none());
        assert!(!ctrl.elapsed().is_running());
    }

    #[test]
    fn start_enters_first_exercise() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Push-ups", 3, 60)]), Some("plan-1".into()))
            .unwrap();

        assert_eq!(ctrl.phase(), SessionPhase::InProgress);
        assert_eq!((ctrl.exercise_index(), ctrl.set_number()), (0, 1));
        assert!(!ctrl.is_resting());
        assert!(ctrl.elapsed().is_running());

        let session = ctrl.session().unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(session.workout_plan_id.as_deref(), Some("plan-1"));
        assert!(session.end_time.is_none());
        assert_eq!(ctrl.tracker().snapshot().reps.len(), 3);

        let err = ctrl.start(workout(&[("Rows", 1, 0)]), None).unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
    }

    #[test]
    fn full_run_records_every_exercise_in_order() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("A", 2, 10), ("B", 1, 10), ("C", 3, 0)]), None)
            .unwrap();

        let mut guard = 0;
        while !ctrl.phase().is_terminal() {
            if ctrl.is_resting() {
                ctrl.skip_rest().unwrap();
            }
            ctrl.complete_set(SetEntry::default()).unwrap();
            guard += 1;
            assert!(guard < 20);
        }

        assert_eq!(ctrl.phase(), SessionPhase::Completed);
        let session = ctrl.session().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        let names: Vec<_> = session
            .exercises_completed
            .iter()
            .map(|result| result.exercise_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        let sets: Vec<_> = session
            .exercises_completed
            .iter()
            .map(|result| result.sets_completed)
            .collect();
        assert_eq!(sets, vec![2, 1, 3]);
        assert!(session.end_time.is_some());
        assert_eq!(session.duration_minutes, Some(0));
        assert!(!ctrl.elapsed().is_running());
    }

    #[test]
    fn two_set_exercise_with_skipped_rest() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Squats", 2, 30)]), None).unwrap();

        ctrl.complete_set(SetEntry::default()).unwrap();
        assert!(ctrl.is_resting());
        assert_eq!(ctrl.rest_timer().remaining(), 30);
        assert_eq!(ctrl.set_number(), 2);
        assert!(ctrl.session().unwrap().exercises_completed.is_empty());

        ctrl.skip_rest().unwrap();
        assert_eq!(ctrl.rest_timer().state(), RestState::Expired);

        ctrl.complete_set(SetEntry::default()).unwrap();
        assert_eq!(ctrl.phase(), SessionPhase::Completed);
        assert_eq!(ctrl.session().unwrap().exercises_completed.len(), 1);
    }

    #[test]
    fn skipping_every_exercise_completes_with_default_results() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("A", 1, 60), ("B", 1, 60), ("C", 1, 60)]), None)
            .unwrap();

        for expected_index in 0..3 {
            assert_eq!(ctrl.exercise_index(), expected_index);
            ctrl.skip_exercise().unwrap();
        }

        assert_eq!(ctrl.phase(), SessionPhase::Completed);
        let results = &ctrl.session().unwrap().exercises_completed;
        assert_eq!(results.len(), 3);
        for result in results {
            assert_eq!(result.sets_completed, 0);
            assert_eq!(result.reps_completed, vec![String::new()]);
            assert_eq!(result.weight_used, "");
            assert_eq!(result.notes, "");
        }
    }

    #[test]
    fn skip_keeps_partial_progress_and_cancels_rest() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Rows", 3, 45), ("Curls", 2, 45)]), None)
            .unwrap();

        ctrl.complete_set(SetEntry {
            reps: Some("12".into()),
            weight: Some("20".into()),
            notes: None,
        })
        .unwrap();
        assert!(ctrl.is_resting());

        ctrl.skip_exercise().unwrap();
        assert!(!ctrl.is_resting());
        assert_eq!(ctrl.rest_timer().state(), RestState::Idle);
        assert_eq!((ctrl.exercise_index(), ctrl.set_number()), (1, 1));

        let result = &ctrl.session().unwrap().exercises_completed[0];
        assert_eq!(result.exercise_name, "Rows");
        assert_eq!(result.sets_completed, 1);
        assert_eq!(result.reps_completed, vec!["12".to_string(), String::new(), String::new()]);
        assert_eq!(result.weight_used, "20");
    }

    #[test]
    fn completing_a_set_during_rest_is_rejected() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Dips", 3, 20)]), None).unwrap();
        ctrl.complete_set(SetEntry::default()).unwrap();

        assert_eq!(
            ctrl.complete_set(SetEntry::default()).unwrap_err(),
            SessionError::RestInProgress
        );
        assert_eq!(ctrl.set_number(), 2);
    }

    #[test]
    fn rest_expires_through_ticks() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Press", 2, 3)]), None).unwrap();
        ctrl.complete_set(SetEntry::default()).unwrap();

        assert_eq!(tick_rest(&mut ctrl), TickOutcome::Rest(2));
        assert_eq!(tick_rest(&mut ctrl), TickOutcome::Rest(1));
        assert_eq!(tick_rest(&mut ctrl), TickOutcome::RestExpired);
        assert_eq!(tick_rest(&mut ctrl), TickOutcome::Ignored);
        assert!(!ctrl.is_resting());

        ctrl.complete_set(SetEntry::default()).unwrap();
        assert_eq!(ctrl.phase(), SessionPhase::Completed);
    }

    #[test]
    fn pause_round_trip_preserves_position_and_skips_paused_time() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Lunges", 3, 30)]), None).unwrap();
        ctrl.complete_set(SetEntry::default()).unwrap();
        tick_elapsed(&mut ctrl);
        tick_elapsed(&mut ctrl);
        let stale = ctrl.elapsed().clock().pending().unwrap();

        let before = (ctrl.exercise_index(), ctrl.set_number(), ctrl.is_resting());
        assert_eq!(ctrl.toggle_pause().unwrap(), SessionPhase::Paused);

        assert_eq!(ctrl.handle_tick(stale), TickOutcome::Ignored);
        assert_eq!(tick_elapsed(&mut ctrl), TickOutcome::Ignored);

        assert_eq!(ctrl.toggle_pause().unwrap(), SessionPhase::InProgress);
        let after = (ctrl.exercise_index(), ctrl.set_number(), ctrl.is_resting());
        assert_eq!(before, after);
        assert_eq!(ctrl.elapsed().seconds(), 2);
        assert_eq!(tick_elapsed(&mut ctrl), TickOutcome::Elapsed(3));
    }

    #[test]
    fn pausing_the_workout_leaves_rest_running() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Rows", 2, 10)]), None).unwrap();
        ctrl.complete_set(SetEntry::default()).unwrap();
        ctrl.pause().unwrap();

        assert_eq!(tick_rest(&mut ctrl), TickOutcome::Rest(9));
        assert_eq!(ctrl.toggle_rest().unwrap(), RestState::Paused(9));
        assert_eq!(ctrl.reset_rest().unwrap(), RestState::Running(10));
    }

    #[test]
    fn pause_is_illegal_outside_a_session() {
        let mut ctrl = controller();
        assert!(matches!(
            ctrl.pause().unwrap_err(),
            SessionError::InvalidState {
                phase: SessionPhase::Selecting,
                ..
            }
        ));
        assert!(ctrl.resume().is_err());
        assert!(ctrl.request_end().is_err());
    }

    #[test]
    fn cancelled_end_restores_previous_state() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Rows", 3, 30)]), None).unwrap();
        ctrl.complete_set(SetEntry::default()).unwrap();
        let before = ctrl.snapshot();

        ctrl.request_end().unwrap();
        assert_eq!(ctrl.phase(), SessionPhase::Paused);
        assert!(ctrl.is_end_pending());
        assert!(!ctrl.elapsed().is_running());
        assert!(ctrl.complete_set(SetEntry::default()).is_err());
        assert!(ctrl.resume().is_err());

        ctrl.cancel_end().unwrap();
        assert_eq!(ctrl.snapshot(), before);
        assert!(ctrl.elapsed().is_running());
    }

    #[test]
    fn cancelling_end_from_pause_resumes_the_workout() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Rows", 2, 30)]), None).unwrap();
        tick_elapsed(&mut ctrl);
        ctrl.pause().unwrap();

        ctrl.request_end().unwrap();
        ctrl.cancel_end().unwrap();

        assert_eq!(ctrl.phase(), SessionPhase::InProgress);
        assert!(!ctrl.is_end_pending());
        assert!(ctrl.elapsed().is_running());
        assert_eq!(tick_elapsed(&mut ctrl), TickOutcome::Elapsed(2));
        ctrl.complete_set(SetEntry::default()).unwrap();
        assert_eq!(ctrl.set_number(), 2);
    }

    #[test]
    fn confirmed_end_is_incomplete_and_staged_once() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Rows", 3, 30), ("Curls", 3, 30)]), None)
            .unwrap();
        ctrl.complete_set(SetEntry::default()).unwrap();

        ctrl.request_end().unwrap();
        ctrl.confirm_end().unwrap();

        assert_eq!(ctrl.phase(), SessionPhase::Incomplete);
        assert!(!ctrl.is_resting());
        assert!(!ctrl.rest_timer().clock().is_running());
        let session = ctrl.session().unwrap();
        assert_eq!(session.status, SessionStatus::Incomplete);
        assert!(session.end_time.is_some());
        assert_eq!(session.exercises_completed.len(), 1);
        assert_eq!(session.exercises_completed[0].sets_completed, 1);

        let staged = ctrl.take_pending_record().unwrap();
        assert_eq!(staged.status, SessionStatus::Incomplete);
        assert!(ctrl.take_pending_record().is_none());
        ctrl.finish_record(Ok(())).unwrap();
        assert_eq!(ctrl.record_status(), &RecordStatus::Recorded);
        assert!(ctrl.take_pending_record().is_none());
        assert!(ctrl.retry_record().is_err());
    }

    #[test]
    fn terminal_state_rejects_further_commands() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Rows", 1, 30)]), None).unwrap();
        ctrl.complete_set(SetEntry::default()).unwrap();

        assert!(ctrl.complete_set(SetEntry::default()).is_err());
        assert!(ctrl.skip_exercise().is_err());
        assert!(ctrl.pause().is_err());
        assert!(ctrl.request_end().is_err());
        assert!(ctrl.skip_rest().is_err());
        assert_eq!(ctrl.session().unwrap().exercises_completed.len(), 1);
    }

    #[test]
    fn failed_record_keeps_terminal_state_and_allows_retry() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Rows", 1, 30)]), None).unwrap();
        ctrl.skip_exercise().unwrap();

        let session = ctrl.take_pending_record().unwrap();
        let err = ctrl.finish_record(Err("disk full".into())).unwrap_err();
        assert_eq!(
            err,
            SessionError::RecordingFailed {
                reason: "disk full".into()
            }
        );
        assert_eq!(ctrl.phase(), SessionPhase::Completed);

        ctrl.retry_record().unwrap();
        assert_eq!(ctrl.take_pending_record(), Some(session));
        ctrl.finish_record(Ok(())).unwrap();

        ctrl.dismiss().unwrap();
        assert_eq!(ctrl.phase(), SessionPhase::Selecting);
        assert!(ctrl.session().is_none());
    }

    #[test]
    fn dismiss_waits_for_the_recorder() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Rows", 1, 30)]), None).unwrap();
        assert!(ctrl.dismiss().is_err());

        ctrl.skip_exercise().unwrap();
        assert!(ctrl.dismiss().is_err());
    }

    #[test]
    fn set_entry_reps_land_on_the_current_set() {
        let mut ctrl = controller();
        ctrl.start(workout(&[("Bench", 2, 0)]), None).unwrap();

        ctrl.complete_set(SetEntry {
            reps: Some("10".into()),
            ..SetEntry::default()
        })
        .unwrap();
        assert_eq!(ctrl.rest_timer().state(), RestState::Expired);
        ctrl.record_rep(1, "8").unwrap();
        assert_eq!(
            ctrl.record_rep(2, "8").unwrap_err(),
            SessionError::OutOfRange { index: 2, sets: 2 }
        );
        ctrl.complete_set(SetEntry::default()).unwrap();

        let result = &ctrl.session().unwrap().exercises_completed[0];
        assert_eq!(result.reps_completed, vec!["10".to_string(), "8".to_string()]);
        assert_eq!(result.sets_completed, 2);
    }

    #[test]
    fn zero_set_exercise_completes_as_a_single_set() {
        let mut ctrl = controller();
        let mut hold = Exercise::new("Dead hang", 1, "30s");
        hold.sets = 0;
        ctrl.start(Workout::new("Grip", vec![hold]), None).unwrap();

        ctrl.complete_set(SetEntry {
            reps: Some("30s".into()),
            ..SetEntry::default()
        })
        .unwrap();

        assert_eq!(ctrl.phase(), SessionPhase::Completed);
        let result = &ctrl.session().unwrap().exercises_completed[0];
        assert_eq!(result.reps_completed, vec!["30s".to_string()]);
        assert_eq!(result.sets_completed, 1);
    }
}
