//! One-shot signals released after a main loop cycle

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// How the cycle a waiter was released by ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    Failed,
    /// The loop exited before another cycle ran
    Stopped,
}

/// Receiving half of a cycle-completion signal
#[derive(Debug)]
pub struct CycleWaiter {
    rx: Receiver<CycleOutcome>,
}

pub(crate) fn cycle_signal() -> (Sender<CycleOutcome>, CycleWaiter) {
    let (tx, rx) = channel::bounded(1);
    (tx, CycleWaiter { rx })
}

impl CycleWaiter {
    /// Block until the cycle finished
    pub fn wait(self) -> CycleOutcome {
        self.rx.recv().unwrap_or(CycleOutcome::Stopped)
    }

    /// Block at most `timeout`. Returns `None` if the cycle has not finished yet.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CycleOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(CycleOutcome::Stopped),
        }
    }

    pub fn is_released(&self) -> bool {
        !self.rx.is_empty()
    }
}
