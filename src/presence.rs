//! # Presence-Line Emulator
//!
//! Emulates the edge-triggered detection lines that wired ports use for
//! topology detection. Over the radio link a line is just a boolean the peer
//! reports through notifications, so this module turns reported levels back
//! into rising/falling edge interrupts.
//!
//! ## Line State
//!
//! Each line holds its current level and the edge it is armed for:
//!
//! | operation            | level     | armed     |
//! |----------------------|-----------|-----------|
//! | initial / `set_default` | 0      | Rising    |
//! | `push`               | 1         | None      |
//! | `set_reverse`        | unchanged | Falling   |
//!
//! A remote update only fires when the level actually changes and the
//! change matches the armed edge. Only line 0 is mirrored to the peer.
//!
//! Out-of-range line indices are ignored by every public operation.

use log::{Level, log};

use crate::channels::LinkChannel;
use crate::events::{LinkHooks, Notification};
use crate::LinkError;

/// Upper bound of emulated presence lines
pub const MAX_PRESENCE_LINES: usize = 4;

/// Edge a line is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmedEdge {
    None,
    Rising,
    Falling,
}

/// Opaque hardware identity of a presence line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineId {
    pub pin: u16,
    pub port: u32,
    pub irq: u8,
}

impl LineId {
    pub const fn new(pin: u16, port: u32, irq: u8) -> Self {
        Self { pin, port, irq }
    }
}

/// State of one emulated line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceLine {
    id: LineId,
    level: bool,
    armed: ArmedEdge,
}

impl PresenceLine {
    const fn new(id: LineId) -> Self {
        Self {
            id,
            level: false,
            armed: ArmedEdge::Rising,
        }
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn level(&self) -> bool {
        self.level
    }

    pub fn armed(&self) -> ArmedEdge {
        self.armed
    }

    /// Applies a reported level and tells whether the armed edge fired
    fn apply(&mut self, level: bool) -> bool {
        if self.level == level {
            return false;
        }
        self.level = level;
        match self.armed {
            ArmedEdge::None => false,
            ArmedEdge::Rising => level,
            ArmedEdge::Falling => !level,
        }
    }
}

/// Fixed set of `LINES` emulated presence lines
pub struct PresenceLines<const LINES: usize> {
    lines: [PresenceLine; LINES],
}

impl<const LINES: usize> PresenceLines<LINES> {
    const VALID_COUNT: () = assert!(LINES >= 1 && LINES <= MAX_PRESENCE_LINES, "presence line count must be 1..=4");

    /// Registers the lines; every line starts at level 0 armed for a rising edge
    pub fn new(ids: [LineId; LINES]) -> Self {
        let () = Self::VALID_COUNT;
        Self {
            lines: ids.map(PresenceLine::new),
        }
    }

    pub fn line(&self, port: u8) -> Result<&PresenceLine, LinkError> {
        self.lines.get(port as usize).ok_or(LinkError::InvalidPortIndex(port))
    }

    fn line_mut(&mut self, port: u8) -> Result<&mut PresenceLine, LinkError> {
        self.lines.get_mut(port as usize).ok_or(LinkError::InvalidPortIndex(port))
    }

    /// Drives the line high and disarms it
    pub fn push<C: LinkChannel>(&mut self, port: u8, channel: &mut C) -> Result<(), LinkError> {
        self.set(port, true, ArmedEdge::None, channel)
    }

    /// Drives the line low and arms it for a rising edge
    pub fn set_default<C: LinkChannel>(&mut self, port: u8, channel: &mut C) -> Result<(), LinkError> {
        self.set(port, false, ArmedEdge::Rising, channel)
    }

    /// Arms the line for a falling edge, level unchanged
    pub fn set_reverse(&mut self, port: u8) {
        match self.line_mut(port) {
            Ok(line) => line.armed = ArmedEdge::Falling,
            Err(error) => log!(Level::Debug, "Ignoring reverse request: {}", error),
        }
    }

    /// Current level; out-of-range lines read low
    pub fn get_state(&self, port: u8) -> bool {
        self.line(port).map(|line| line.level).unwrap_or(false)
    }

    /// Applies the level reported by the peer, notifying an armed edge
    ///
    /// Returns whether an edge was delivered.
    pub fn on_remote_update<H: LinkHooks>(&mut self, port: u8, level: bool, hooks: &mut H) -> bool {
        let line = match self.line_mut(port) {
            Ok(line) => line,
            Err(error) => {
                log!(Level::Debug, "Ignoring remote level: {}", error);
                return false;
            }
        };
        if !line.apply(level) {
            return false;
        }
        log!(
            Level::Debug,
            "Presence line {} {} edge",
            port,
            if level { "rising" } else { "falling" }
        );
        hooks.notify(Notification::Edge(port));
        true
    }

    fn set<C: LinkChannel>(&mut self, port: u8, level: bool, armed: ArmedEdge, channel: &mut C) -> Result<(), LinkError> {
        let line = match self.line_mut(port) {
            Ok(line) => line,
            Err(error) => {
                log!(Level::Debug, "Ignoring line update: {}", error);
                return Ok(());
            }
        };
        line.level = level;
        line.armed = armed;

        if port == 0 {
            channel.publish_line_level(level).map_err(LinkError::from)?;
        }
        Ok(())
    }
}
