//! Shared fakes for the unit tests

use core::cell::Cell;

use crate::channels::{ChannelError, LinkChannel};
use crate::events::{LinkHooks, Notification};
use crate::tick::TickSource;

/// Uptime clock whose wrapping counter advances by `step` on every reading
pub struct ManualTicks {
    uptime: Cell<u64>,
    wrap_max: u32,
    step: u32,
}

impl ManualTicks {
    pub fn new(start: u32, wrap_max: u32, step: u32) -> Self {
        Self {
            uptime: Cell::new(start as u64),
            wrap_max,
            step,
        }
    }

    /// Moves the uptime to `uptime_ms`
    pub fn set(&self, uptime_ms: u64) {
        self.uptime.set(uptime_ms);
    }

    /// Current wrapping counter value without advancing
    pub fn peek(&self) -> u32 {
        (self.uptime.get() % self.wrap_max as u64) as u32
    }
}

impl TickSource for ManualTicks {
    fn now_ms(&self) -> u32 {
        let current = self.peek();
        self.uptime.set(self.uptime.get() + self.step as u64);
        current
    }

    fn wrap_max_ms(&self) -> u32 {
        self.wrap_max
    }

    fn uptime_ms(&self) -> u64 {
        self.uptime.get()
    }
}

#[derive(Default)]
pub struct RecordingHooks {
    pub notifications: Vec<Notification>,
    pub tx_locked: bool,
}

impl RecordingHooks {
    /// Hooks reporting an outstanding transmission
    pub fn locked() -> Self {
        Self {
            notifications: Vec::new(),
            tx_locked: true,
        }
    }

    /// Received bytes in delivery order
    pub fn bytes(&self) -> Vec<u8> {
        self.notifications
            .iter()
            .filter_map(|notification| match notification {
                Notification::Byte(byte) => Some(*byte),
                _ => None,
            })
            .collect()
    }
}

impl LinkHooks for RecordingHooks {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn tx_locked(&self) -> bool {
        self.tx_locked
    }
}

/// Channel recording every accepted send with the tick it left at
pub struct StampingChannel<'a> {
    ticks: &'a ManualTicks,
    max_payload: usize,
    pub sends: Vec<(u32, Vec<u8>)>,
    pub busy: usize,
    pub faulty: bool,
    pub published: Vec<bool>,
}

impl<'a> StampingChannel<'a> {
    pub fn new(ticks: &'a ManualTicks, max_payload: usize) -> Self {
        Self {
            ticks,
            max_payload,
            sends: Vec::new(),
            busy: 0,
            faulty: false,
            published: Vec::new(),
        }
    }
}

impl LinkChannel for StampingChannel<'_> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        if self.faulty {
            return Err(ChannelError::Fault);
        }
        if self.busy > 0 {
            self.busy -= 1;
            return Err(ChannelError::WouldBlock);
        }
        self.sends.push((self.ticks.peek(), bytes.to_vec()));
        Ok(())
    }

    fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn publish_line_level(&mut self, level: bool) -> Result<(), ChannelError> {
        if self.faulty {
            return Err(ChannelError::Fault);
        }
        self.published.push(level);
        Ok(())
    }
}
