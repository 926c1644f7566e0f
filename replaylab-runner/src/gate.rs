//! Shutdown gate: lets in-flight runs finish while refusing new ones.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::RunError;

#[derive(Debug, Default)]
struct GateState {
    active: usize,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct RunGate {
    state: Mutex<GateState>,
    idle: Condvar,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a run. Fails once [`terminate`](Self::terminate) was called.
    pub fn enter(&self) -> Result<RunGuard<'_>, RunError> {
        let mut state = self.lock();
        if state.closed {
            return Err(RunError::ShuttingDown);
        }
        state.active += 1;
        Ok(RunGuard { gate: self })
    }

    /// Refuse new runs and block until every registered run has finished.
    pub fn terminate(&self) {
        let mut state = self.lock();
        state.closed = true;
        while state.active > 0 {
            state = self
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn active(&self) -> usize {
        self.lock().active
    }
}

/// Held for the duration of one run.
#[derive(Debug)]
pub struct RunGuard<'a> {
    gate: &'a RunGate,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.lock();
        state.active -= 1;
        if state.active == 0 {
            self.gate.idle.notify_all();
        }
    }
}
