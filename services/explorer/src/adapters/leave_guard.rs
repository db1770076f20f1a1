//! services/explorer/src/adapters/leave_guard.rs
//!
//! The console counterpart of a browser "beforeunload" prompt: it remembers
//! whether leaving right now would abandon a running generation.

use explorer_core::ports::LeaveGuard;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
pub struct ConsoleLeaveGuard {
    warning: Mutex<Option<String>>,
}

impl ConsoleLeaveGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.warning().is_some()
    }

    /// The message to show before quitting, if leaving now would lose work.
    pub fn warning(&self) -> Option<String> {
        self.warning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LeaveGuard for ConsoleLeaveGuard {
    fn arm(&self, message: &str) {
        debug!("Leave warning armed");
        *self.warning.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.to_string());
    }

    fn disarm(&self) {
        debug!("Leave warning disarmed");
        *self.warning.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
