//! # Echo Channel - Loopback Channel for Testing
//!
//! Minimal [`LinkChannel`] that keeps every sent chunk instead of putting it
//! on the air. Recorded chunks can be replayed as inbound
//! [`LinkEvent::Received`] events, which closes the loop between the transmit
//! and receive paths of a single link, or forwarded to a second link to
//! emulate a peer.
//!
//! The channel can be told to report `would_block` for a number of sends or
//! to fault permanently, which is how pacing and error propagation are
//! exercised without hardware.

use heapless::Deque;
use log::{Level, log};

use super::{ChannelError, LinkChannel};
use crate::LinkEvent;
use crate::msg_queue::Chunk;

/// Loopback channel holding up to `DEPTH` sent chunks of at most `N` bytes
pub struct EchoChannel<const N: usize, const DEPTH: usize> {
    max_payload: usize,
    sent: Deque<Chunk<N>, DEPTH>,
    published_level: Option<bool>,
    publish_count: usize,
    busy_sends: usize,
    faulty: bool,
}

impl<const N: usize, const DEPTH: usize> Default for EchoChannel<N, DEPTH> {
    fn default() -> Self {
        Self::new(N)
    }
}

impl<const N: usize, const DEPTH: usize> EchoChannel<N, DEPTH> {
    /// Creates a channel reporting `max_payload` (clamped to `N`)
    pub fn new(max_payload: usize) -> Self {
        Self {
            max_payload: max_payload.min(N),
            sent: Deque::new(),
            published_level: None,
            publish_count: 0,
            busy_sends: 0,
            faulty: false,
        }
    }

    /// Makes the next `count` sends report `would_block`
    pub fn set_busy_sends(&mut self, count: usize) {
        self.busy_sends = count;
    }

    /// Makes every following primitive report a fault
    pub fn set_faulty(&mut self, faulty: bool) {
        self.faulty = faulty;
    }

    /// Oldest recorded chunk, removed from the record
    pub fn take_sent(&mut self) -> Option<Chunk<N>> {
        self.sent.pop_front()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }

    /// Recorded chunks, oldest first
    pub fn sent(&self) -> impl Iterator<Item = &Chunk<N>> {
        self.sent.iter()
    }

    /// Last level mirrored through [`LinkChannel::publish_line_level`]
    pub fn published_level(&self) -> Option<bool> {
        self.published_level
    }

    pub fn publish_count(&self) -> usize {
        self.publish_count
    }

    /// Turns the oldest recorded chunk into an inbound event
    pub fn echo_next(&mut self) -> Option<LinkEvent<N>> {
        self.sent.pop_front().map(LinkEvent::Received)
    }
}

impl<const N: usize, const DEPTH: usize> LinkChannel for EchoChannel<N, DEPTH> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        if self.faulty {
            return Err(ChannelError::Fault);
        }
        if self.busy_sends > 0 {
            self.busy_sends -= 1;
            return Err(ChannelError::WouldBlock);
        }
        if bytes.len() > self.max_payload {
            log!(Level::Error, "Echo channel got {} bytes, payload limit is {}", bytes.len(), self.max_payload);
            return Err(ChannelError::Fault);
        }
        let chunk = Chunk::<N>::from_slice(bytes).map_err(|_| ChannelError::Fault)?;
        // The record is bounded like a real stack buffer: no room means busy
        self.sent.push_back(chunk).map_err(|_| ChannelError::WouldBlock)?;
        log::trace!("Echo channel recorded {} bytes", bytes.len());
        Ok(())
    }

    fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn publish_line_level(&mut self, level: bool) -> Result<(), ChannelError> {
        if self.faulty {
            return Err(ChannelError::Fault);
        }
        self.published_level = Some(level);
        self.publish_count += 1;
        Ok(())
    }
}
