//! Single-slot notification cell.
//!
//! The caller resets the cell before sending a request and then blocks on it.
//! The background side sets it only after the response message has been
//! enqueued, so a woken caller always finds a message (or a closed channel).

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

const UNSET: u32 = 0;
const SET: u32 = 1;

/// Shared readiness flag with blocking wait.
#[derive(Debug, Default)]
pub struct NotifyCell {
    state: Mutex<u32>,
    ready: Condvar,
}

impl NotifyCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the flag. Called by the caller before each request.
    pub fn reset(&self) {
        *self.state.lock() = UNSET;
    }

    /// Set the flag and wake the waiter.
    pub fn notify(&self) {
        let mut state = self.state.lock();
        *state = SET;
        self.ready.notify_all();
    }

    /// Block until the flag is set. There is no deadline.
    pub fn wait(&self) {
        let mut state = self.state.lock();
        while *state != SET {
            self.ready.wait(&mut state);
        }
    }

    /// Block until the flag is set or `timeout` elapses.
    ///
    /// Returns `true` if the flag was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        while *state != SET {
            if self.ready.wait_for(&mut state, timeout).timed_out() {
                return *state == SET;
            }
        }
        true
    }

    pub fn is_set(&self) -> bool {
        *self.state.lock() == SET
    }
}
