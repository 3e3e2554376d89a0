use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::WorkoutSession;

/// Persists a finished or abandoned session. Called once per terminal transition.
#[async_trait]
pub trait SessionRecorder: Send + Sync {
    async fn record(&self, session: &WorkoutSession) -> Result<()>;
}

/// Keeps recorded sessions in memory. Can be switched into a failing mode.
#[derive(Default)]
pub struct MemoryRecorder {
    sessions: Mutex<Vec<WorkoutSession>>,
    failing: AtomicBool,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> Vec<WorkoutSession> {
        match self.sessions.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SessionRecorder for MemoryRecorder {
    async fn record(&self, session: &WorkoutSession) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("recorder unavailable"));
        }
        let mut guard = self
            .sessions
            .lock()
            .map_err(|_| anyhow!("recorder lock poisoned"))?;
        guard.push(session.clone());
        Ok(())
    }
}
