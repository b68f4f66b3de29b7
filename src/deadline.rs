//! # Deadline
//!
//! Single-shot countdown used to detect stalled acknowledgments and
//! incomplete receptions.
//!
//! There is at most one outstanding countdown. Arming always cancels the
//! previous one and restarts the full duration, so a deadline that keeps
//! getting re-armed never fires. The expiry is kept as an absolute uptime,
//! so a poll that comes late by any number of tick wraps still fires.

use log::{Level, log};

use crate::tick::TickSource;

/// Single outstanding countdown
#[derive(Debug, Default)]
pub struct Deadline {
    expires_at_ms: Option<u64>,
}

impl Deadline {
    /// Creates a disarmed deadline
    pub const fn new() -> Self {
        Self { expires_at_ms: None }
    }

    /// Cancels any running countdown and starts a new one of `duration_ms`
    ///
    /// A zero duration only cancels.
    pub fn arm<T: TickSource>(&mut self, duration_ms: u32, ticks: &T) {
        if duration_ms == 0 {
            self.cancel();
            return;
        }
        self.expires_at_ms = Some(ticks.uptime_ms().saturating_add(duration_ms as u64));
    }

    /// Stops the running countdown, if any
    pub fn cancel(&mut self) {
        self.expires_at_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.expires_at_ms.is_some()
    }

    /// Reports whether the countdown expired
    ///
    /// Returns `true` exactly once per armed countdown; the deadline is
    /// disarmed when it fires.
    pub fn poll<T: TickSource>(&mut self, ticks: &T) -> bool {
        let Some(expires_at_ms) = self.expires_at_ms else {
            return false;
        };

        let now = ticks.uptime_ms();
        if now < expires_at_ms {
            return false;
        }
        log!(Level::Debug, "Deadline expired {} ms late", now - expires_at_ms);
        self.expires_at_ms = None;
        true
    }
}
