use std::time::Duration;

use serde::Serialize;

use super::clock::{Clock, Tick};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(tag = "status", content = "remaining", rename_all = "camelCase")]
pub enum RestState {
    #[default]
    Idle,
    Running(u32),
    Paused(u32),
    Expired,
}

impl RestState {
    pub fn remaining(&self) -> u32 {
        match self {
            RestState::Running(remaining) | RestState::Paused(remaining) => *remaining,
            RestState::Idle | RestState::Expired => 0,
        }
    }

    /// Running or paused: the user is still between sets.
    pub fn is_active(&self) -> bool {
        matches!(self, RestState::Running(_) | RestState::Paused(_))
    }
}

/// Countdown between sets. Owns its clock and stops it the moment it expires.
#[derive(Debug)]
pub struct RestTimer<C: Clock> {
    state: RestState,
    clock: C,
    interval: Duration,
}

impl<C: Clock> RestTimer<C> {
    pub fn new(clock: C, interval: Duration) -> Self {
        Self {
            state: RestState::Idle,
            clock,
            interval,
        }
    }

    pub fn state(&self) -> RestState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        self.state.remaining()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Starts a countdown of `duration_seconds`. Negative input is clamped to zero,
    /// which expires immediately without starting the clock.
    pub fn start(&mut self, duration_seconds: i64) {
        let seconds = duration_seconds.clamp(0, i64::from(u32::MAX)) as u32;
        if seconds == 0 {
            self.clock.stop();
            self.state = RestState::Expired;
            return;
        }
        self.state = RestState::Running(seconds);
        self.clock.start(self.interval);
    }

    /// Restarts from `duration_seconds` regardless of the current state.
    pub fn reset(&mut self, duration_seconds: i64) {
        self.start(duration_seconds);
    }

    /// Applies a clock tick. Returns true when this tick expired the countdown.
    pub fn tick(&mut self, tick: Tick) -> bool {
        if !self.clock.accepts(tick) {
            return false;
        }
        let RestState::Running(remaining) = self.state else {
            return false;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.state = RestState::Expired;
            self.clock.stop();
            true
        } else {
            self.state = RestState::Running(remaining);
            false
        }
    }

    /// Running pauses, paused resumes. Idle and expired timers are left alone.
    pub fn toggle(&mut self) -> RestState {
        match self.state {
            RestState::Running(remaining) => {
                self.clock.stop();
                self.state = RestState::Paused(remaining);
            }
            RestState::Paused(remaining) => {
                self.state = RestState::Running(remaining);
                self.clock.start(self.interval);
            }
            RestState::Idle | RestState::Expired => {}
        }
        self.state
    }

    pub fn skip(&mut self) {
        self.clock.stop();
        self.state = RestState::Expired;
    }

    /// Back to idle, used when a new exercise begins or the session ends.
    pub fn clear(&mut self) {
        self.clock.stop();
        self.state = RestState::Idle;
    }
}

/// Workout-elapsed counter: one second per accepted tick, frozen while its clock is stopped.
#[derive(Debug)]
pub struct ElapsedTimer<C: Clock> {
    seconds: u64,
    clock: C,
    interval: Duration,
}

impl<C: Clock> ElapsedTimer<C> {
    pub fn new(clock: C, interval: Duration) -> Self {
        Self {
            seconds: 0,
            clock,
            interval,
        }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn restart(&mut self) {
        self.seconds = 0;
        self.clock.start(self.interval);
    }

    pub fn resume(&mut self) {
        if !self.clock.is_running() {
            self.clock.start(self.interval);
        }
    }

    pub fn pause(&mut self) {
        self.clock.stop();
    }

    pub fn tick(&mut self, tick: Tick) -> bool {
        if !self.clock.accepts(tick) {
            return false;
        }
        self.seconds += 1;
        true
    }
}
