use std::{sync::Arc, time::Duration};

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{
    models::Workout,
    timer::{Clock, ClockId, IntervalClock, Tick},
};

use super::{
    controller::{SessionController, SessionSnapshot, SetEntry, TickOutcome},
    error::SessionError,
    recorder::SessionRecorder,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const REQUEST_QUEUE_DEPTH: usize = 32;
const EVENT_QUEUE_DEPTH: usize = 16;

/// Things that happen to a session without a user command behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkoutEvent {
    /// The rest countdown ran out on its own. A manual skip does not count.
    RestExpired { exercise_index: usize, set_number: u32 },
}

type Reply = oneshot::Sender<Result<SessionSnapshot, SessionError>>;

#[derive(Debug)]
enum Command {
    Start {
        workout: Workout,
        plan_id: Option<String>,
    },
    Dismiss,
    RecordRep {
        set_index: usize,
        value: String,
    },
    SetWeight(String),
    SetNotes(String),
    CompleteSet(SetEntry),
    SkipExercise,
    TogglePause,
    RequestEnd,
    ConfirmEnd,
    CancelEnd,
    ToggleRest,
    ResetRest,
    SkipRest,
    RetryRecord,
    Snapshot,
}

enum Request {
    Command(Command, Reply),
    Shutdown(oneshot::Sender<()>),
}

/// Hosts a [`SessionController`] on its own task.
///
/// The task is the single mutator of session state: user commands arrive on one
/// channel, clock ticks on another, and both are applied strictly one at a time.
pub struct WorkoutRuntime;

impl WorkoutRuntime {
    pub fn spawn(recorder: Arc<dyn SessionRecorder>, tick_interval: Duration) -> WorkoutHandle {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        let controller = SessionController::new(
            IntervalClock::new(ClockId::Elapsed, tick_tx.clone()),
            IntervalClock::new(ClockId::Rest, tick_tx),
            tick_interval,
        );
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let (event_tx, _) = broadcast::channel(EVENT_QUEUE_DEPTH);

        tokio::spawn(event_loop(
            controller,
            request_rx,
            tick_rx,
            recorder,
            snapshot_tx,
            event_tx.clone(),
        ));
        log_info!("Workout runtime started (tick every {}ms)", tick_interval.as_millis());

        WorkoutHandle {
            requests: request_tx,
            snapshots: snapshot_rx,
            events: event_tx,
        }
    }
}

async fn event_loop<C: Clock>(
    mut controller: SessionController<C>,
    mut requests: mpsc::Receiver<Request>,
    mut ticks: mpsc::UnboundedReceiver<Tick>,
    recorder: Arc<dyn SessionRecorder>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<WorkoutEvent>,
) {
    loop {
        tokio::select! {
            biased;
            request = requests.recv() => match request {
                Some(Request::Command(command, reply)) => {
                    let retry = matches!(command, Command::RetryRecord);
                    let mut result = apply(&mut controller, command);
                    if let Some(err) = flush_record(&mut controller, recorder.as_ref(), &snapshots).await {
                        if retry && result.is_ok() {
                            result = Err(err);
                        }
                    }
                    let snapshot = controller.snapshot();
                    snapshots.send_replace(snapshot.clone());
                    let _ = reply.send(result.map(|()| snapshot));
                }
                Some(Request::Shutdown(ack)) => {
                    drop(controller);
                    let _ = ack.send(());
                    break;
                }
                None => break,
            },
            Some(tick) = ticks.recv() => {
                match controller.handle_tick(tick) {
                    TickOutcome::Ignored => {
                        log_debug!("Dropped tick from {:?} generation {}", tick.clock, tick.generation);
                    }
                    outcome => {
                        let snapshot = controller.snapshot();
                        if outcome == TickOutcome::RestExpired {
                            log_info!("Rest timer expired");
                            // No subscribers is fine.
                            let _ = events.send(WorkoutEvent::RestExpired {
                                exercise_index: snapshot.exercise_index,
                                set_number: snapshot.set_number,
                            });
                        }
                        snapshots.send_replace(snapshot);
                    }
                }
            }
        }
    }
    log_info!("Workout runtime stopped");
}

fn apply<C: Clock>(controller: &mut SessionController<C>, command: Command) -> Result<(), SessionError> {
    match command {
        Command::Start { workout, plan_id } => controller.start(workout, plan_id),
        Command::Dismiss => controller.dismiss(),
        Command::RecordRep { set_index, value } => controller.record_rep(set_index, value),
        Command::SetWeight(value) => controller.set_weight(value),
        Command::SetNotes(value) => controller.set_notes(value),
        Command::CompleteSet(entry) => controller.complete_set(entry),
        Command::SkipExercise => controller.skip_exercise(),
        Command::TogglePause => controller.toggle_pause().map(|_| ()),
        Command::RequestEnd => controller.request_end(),
        Command::ConfirmEnd => controller.confirm_end(),
        Command::CancelEnd => controller.cancel_end(),
        Command::ToggleRest => controller.toggle_rest().map(|_| ()),
        Command::ResetRest => controller.reset_rest().map(|_| ()),
        Command::SkipRest => controller.skip_rest().map(|_| ()),
        Command::RetryRecord => controller.retry_record(),
        Command::Snapshot => Ok(()),
    }
}

/// Hands a staged terminal session to the recorder. The controller is already in
/// its terminal phase; a failure only changes the record status. Subscribers see the
/// terminal phase before the recorder is awaited.
async fn flush_record<C: Clock>(
    controller: &mut SessionController<C>,
    recorder: &dyn SessionRecorder,
    snapshots: &watch::Sender<SessionSnapshot>,
) -> Option<SessionError> {
    let session = controller.take_pending_record()?;
    snapshots.send_replace(controller.snapshot());
    let outcome = recorder
        .record(&session)
        .await
        .map_err(|err| format!("{err:#}"));

    match controller.finish_record(outcome) {
        Ok(()) => {
            log_info!("Recorded session {} ({})", session.id, session.status.as_str());
            None
        }
        Err(err) => {
            log_warn!("Session {} was not recorded: {err}", session.id);
            Some(err)
        }
    }
}

/// Cloneable front door to a running [`WorkoutRuntime`].
#[derive(Clone)]
pub struct WorkoutHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<WorkoutEvent>,
}

impl WorkoutHandle {
    async fn send(&self, command: Command) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(Request::Command(command, reply_tx))
            .await
            .map_err(|_| SessionError::RuntimeClosed)?;
        reply_rx.await.map_err(|_| SessionError::RuntimeClosed)?
    }

    /// Receives a fresh snapshot after every command and every honoured tick.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<WorkoutEvent> {
        self.events.subscribe()
    }

    pub fn latest(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Snapshot).await
    }

    pub async fn start(
        &self,
        workout: Workout,
        plan_id: Option<String>,
    ) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Start { workout, plan_id }).await
    }

    pub async fn dismiss(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::Dismiss).await
    }

    pub async fn record_rep(
        &self,
        set_index: usize,
        value: impl Into<String>,
    ) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::RecordRep {
            set_index,
            value: value.into(),
        })
        .await
    }

    pub async fn set_weight(&self, value: impl Into<String>) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::SetWeight(value.into())).await
    }

    pub async fn set_notes(&self, value: impl Into<String>) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::SetNotes(value.into())).await
    }

    pub async fn complete_set(&self, entry: SetEntry) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::CompleteSet(entry)).await
    }

    pub async fn skip_exercise(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::SkipExercise).await
    }

    pub async fn toggle_pause(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::TogglePause).await
    }

    pub async fn request_end(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::RequestEnd).await
    }

    pub async fn confirm_end(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::ConfirmEnd).await
    }

    pub async fn cancel_end(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::CancelEnd).await
    }

    pub async fn toggle_rest(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::ToggleRest).await
    }

    pub async fn reset_rest(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::ResetRest).await
    }

    pub async fn skip_rest(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::SkipRest).await
    }

    /// Re-submits a session whose recording failed.
    pub async fn retry_record(&self) -> Result<SessionSnapshot, SessionError> {
        self.send(Command::RetryRecord).await
    }

    /// Stops both clocks and ends the runtime task. Later calls fail with `RuntimeClosed`.
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.requests.send(Request::Shutdown(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Exercise, SessionStatus},
        timer::RestState,
        workout::{controller::RecordStatus, recorder::MemoryRecorder, SessionPhase},
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::{sync::Notify, time::sleep};

    /// Holds every record call until the test opens the gate.
    #[derive(Default)]
    struct GatedRecorder {
        gate: Notify,
        inner: MemoryRecorder,
    }

    #[async_trait]
    impl SessionRecorder for GatedRecorder {
        async fn record(&self, session: &crate::models::WorkoutSession) -> anyhow::Result<()> {
            self.gate.notified().await;
            self.inner.record(session).await
        }
    }

    fn spawn(recorder: Arc<MemoryRecorder>) -> WorkoutHandle {
        WorkoutRuntime::spawn(recorder, Duration::from_secs(1))
    }

    fn workout(sets: u32, rest: u32) -> Workout {
        Workout::new(
            "Upper Body Focus",
            vec![
                Exercise::new("Push-ups", sets, "8-12").with_rest(rest),
                Exercise::new("Dumbbell Rows", sets, "10-12").with_rest(rest),
            ],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_clock_counts_and_excludes_pauses() {
        let handle = spawn(Arc::new(MemoryRecorder::new()));
        handle.start(workout(3, 60), None).await.unwrap();

        sleep(Duration::from_millis(2_500)).await;
        assert_eq!(handle.latest().elapsed_seconds, 2);

        let paused = handle.toggle_pause().await.unwrap();
        assert_eq!(paused.phase, SessionPhase::Paused);
        sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.latest().elapsed_seconds, 2);

        handle.toggle_pause().await.unwrap();
        sleep(Duration::from_millis(1_200)).await;
        assert_eq!(handle.snapshot().await.unwrap().elapsed_seconds, 3);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rest_countdown_expires_on_its_own() {
        let handle = spawn(Arc::new(MemoryRecorder::new()));
        handle.start(workout(2, 3), None).await.unwrap();

        let resting = handle.complete_set(SetEntry::default()).await.unwrap();
        assert!(resting.resting);
        assert_eq!(resting.rest, RestState::Running(3));

        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(handle.latest().rest, RestState::Running(2));

        sleep(Duration::from_secs(2)).await;
        let snapshot = handle.latest();
        assert_eq!(snapshot.rest, RestState::Expired);
        assert!(!snapshot.resting);

        let next = handle.complete_set(SetEntry::default()).await.unwrap();
        assert_eq!(next.exercise_index, 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_ticks() {
        let handle = spawn(Arc::new(MemoryRecorder::new()));
        let mut updates = handle.subscribe();
        handle.start(workout(1, 0), None).await.unwrap();
        let _ = updates.borrow_and_update();

        sleep(Duration::from_millis(1_100)).await;
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().elapsed_seconds, 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ending_early_records_exactly_once() {
        let recorder = Arc::new(MemoryRecorder::new());
        let handle = spawn(recorder.clone());
        handle.start(workout(3, 30), Some("plan-7".into())).await.unwrap();
        handle.complete_set(SetEntry::default()).await.unwrap();

        let pending = handle.request_end().await.unwrap();
        assert!(pending.end_pending);
        assert_eq!(pending.phase, SessionPhase::Paused);

        let ended = handle.confirm_end().await.unwrap();
        assert_eq!(ended.phase, SessionPhase::Incomplete);
        assert_eq!(ended.record, RecordStatus::Recorded);

        sleep(Duration::from_secs(60)).await;
        assert!(handle.confirm_end().await.is_err());

        let recorded = recorder.sessions();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].status, SessionStatus::Incomplete);
        assert_eq!(recorded[0].workout_plan_id.as_deref(), Some("plan-7"));
        assert!(recorded[0].end_time.is_some());
        assert_eq!(handle.latest().rest, RestState::Idle);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn recorder_failure_is_reported_and_retryable() {
        let recorder = Arc::new(MemoryRecorder::new());
        recorder.set_failing(true);
        let handle = spawn(recorder.clone());
        handle.start(workout(1, 0), None).await.unwrap();
        handle.skip_exercise().await.unwrap();

        let done = handle.skip_exercise().await.unwrap();
        assert_eq!(done.phase, SessionPhase::Completed);
        assert!(matches!(done.record, RecordStatus::Failed(_)));
        assert_eq!(handle.latest().record, done.record);
        assert!(recorder.sessions().is_empty());

        let retry = handle.retry_record().await.unwrap_err();
        assert!(matches!(retry, SessionError::RecordingFailed { .. }));

        recorder.set_failing(false);
        let recorded = handle.retry_record().await.unwrap();
        assert_eq!(recorded.record, RecordStatus::Recorded);
        assert_eq!(recorder.sessions().len(), 1);

        let fresh = handle.dismiss().await.unwrap();
        assert_eq!(fresh.phase, SessionPhase::Selecting);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn only_a_countdown_that_runs_out_raises_rest_expired() {
        let handle = spawn(Arc::new(MemoryRecorder::new()));
        let mut events = handle.events();
        handle.start(workout(3, 2), None).await.unwrap();

        handle.complete_set(SetEntry::default()).await.unwrap();
        let skipped = handle.skip_rest().await.unwrap();
        assert_eq!(skipped.rest, RestState::Expired);
        sleep(Duration::from_secs(5)).await;
        assert!(events.try_recv().is_err());

        handle.complete_set(SetEntry::default()).await.unwrap();
        sleep(Duration::from_millis(2_500)).await;
        assert_eq!(
            events.try_recv().unwrap(),
            WorkoutEvent::RestExpired {
                exercise_index: 0,
                set_number: 3
            }
        );
        assert!(events.try_recv().is_err());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn terminal_phase_is_published_before_the_recorder_returns() {
        let recorder = Arc::new(GatedRecorder::default());
        let handle = WorkoutRuntime::spawn(recorder.clone(), Duration::from_secs(1));
        let mut updates = handle.subscribe();
        handle.start(workout(1, 0), None).await.unwrap();
        handle.skip_exercise().await.unwrap();

        let finishing = tokio::spawn({
            let handle = handle.clone();
            async move { handle.skip_exercise().await }
        });

        let seen = updates
            .wait_for(|snapshot| snapshot.record == RecordStatus::Recording)
            .await
            .unwrap()
            .clone();
        assert_eq!(seen.phase, SessionPhase::Completed);
        assert!(recorder.inner.sessions().is_empty());

        recorder.gate.notify_one();
        let done = finishing.await.unwrap().unwrap();
        assert_eq!(done.record, RecordStatus::Recorded);
        assert_eq!(recorder.inner.sessions().len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn commands_after_shutdown_fail() {
        let handle = spawn(Arc::new(MemoryRecorder::new()));
        handle.shutdown().await;
        assert_eq!(
            handle.snapshot().await.unwrap_err(),
            SessionError::RuntimeClosed
        );
    }
}
