use std::time::Duration;

use serde::Serialize;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClockId {
    Elapsed,
    Rest,
}

/// A single tick, tagged with the run of the clock that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub clock: ClockId,
    pub generation: u64,
}

/// Periodic tick source.
///
/// Every `start` opens a new run with a fresh generation. A tick is only honoured
/// when [`Clock::accepts`] returns true, so once `stop` returns nothing from an
/// earlier run can be applied, even if it is already sitting in a queue.
pub trait Clock {
    fn id(&self) -> ClockId;

    /// Begins a new run. A clock that is already running is restarted.
    fn start(&mut self, interval: Duration);

    /// Ends the current run. Calling it on a stopped clock does nothing.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    fn generation(&self) -> u64;

    fn accepts(&self, tick: Tick) -> bool {
        self.is_running() && tick.clock == self.id() && tick.generation == self.generation()
    }
}

/// Clock backed by a tokio interval task that forwards ticks into a channel.
pub struct IntervalClock {
    id: ClockId,
    generation: u64,
    ticks: mpsc::UnboundedSender<Tick>,
    task: Option<(JoinHandle<()>, CancellationToken)>,
}

impl IntervalClock {
    pub fn new(id: ClockId, ticks: mpsc::UnboundedSender<Tick>) -> Self {
        Self {
            id,
            generation: 0,
            ticks,
            task: None,
        }
    }
}

impl Clock for IntervalClock {
    fn id(&self) -> ClockId {
        self.id
    }

    fn start(&mut self, interval: Duration) {
        self.stop();
        self.generation += 1;

        let tick = Tick {
            clock: self.id,
            generation: self.generation,
        };
        let sender = self.ticks.clone();
        let token = CancellationToken::new();
        let token_clone = token.clone();

        let handle = tokio::spawn(async move {
            // The first tick lands one full interval after start, not immediately.
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token_clone.cancelled() => break,
                    _ = ticker.tick() => {
                        if sender.send(tick).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.task = Some((handle, token));
    }

    fn stop(&mut self) {
        if let Some((handle, token)) = self.task.take() {
            token.cancel();
            handle.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for IntervalClock {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Clock for hosts that deliver ticks themselves, such as tests or a frame loop.
#[derive(Debug, Clone)]
pub struct ManualClock {
    id: ClockId,
    generation: u64,
    running: bool,
}

impl ManualClock {
    pub fn new(id: ClockId) -> Self {
        Self {
            id,
            generation: 0,
            running: false,
        }
    }

    /// The tick this clock would deliver right now, if it is running.
    pub fn pending(&self) -> Option<Tick> {
        self.running.then_some(Tick {
            clock: self.id,
            generation: self.generation,
        })
    }
}

impl Clock for ManualClock {
    fn id(&self) -> ClockId {
        self.id
    }

    fn start(&mut self, _interval: Duration) {
        self.generation += 1;
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}
