//! Pause / resume / abort for a running batch
//!
//! The control handle is cloned into whoever drives the batch (signal
//! handler, stdin reader) and checked by the pipeline at every exchange,
//! bucket, scenario and model boundary. A call already in flight always
//! finishes first.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::error::{EvalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Running,
    Paused,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct BatchControl {
    state: Arc<watch::Sender<ControlState>>,
}

impl Default for BatchControl {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchControl {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlState::Running);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn state(&self) -> ControlState {
        *self.state.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.state() == ControlState::Paused
    }

    pub fn is_aborted(&self) -> bool {
        self.state() == ControlState::Aborted
    }

    /// Idempotent; ignored once aborted
    pub fn pause(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state == ControlState::Running {
                *state = ControlState::Paused;
                true
            } else {
                false
            }
        });
        if changed {
            info!("batch paused");
        }
    }

    /// Idempotent; ignored once aborted
    pub fn resume(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state == ControlState::Paused {
                *state = ControlState::Running;
                true
            } else {
                false
            }
        });
        if changed {
            info!("batch resumed");
        }
    }

    /// Abort is final
    pub fn abort(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state != ControlState::Aborted {
                *state = ControlState::Aborted;
                true
            } else {
                false
            }
        });
        if changed {
            info!("batch abort requested");
        }
    }

    /// Cooperative checkpoint.
    ///
    /// Returns immediately while running, waits while paused and fails with
    /// [`EvalError::Cancelled`] once aborted.
    pub async fn checkpoint(&self) -> Result<()> {
        let mut rx = self.state.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            match state {
                ControlState::Running => return Ok(()),
                ControlState::Aborted => return Err(EvalError::Cancelled),
                ControlState::Paused => {}
            }
            if rx.changed().await.is_err() {
                return Err(EvalError::Cancelled);
            }
        }
    }
}
