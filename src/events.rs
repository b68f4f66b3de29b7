//! # Link Events
//!
//! Tagged event types exchanged with the excluded collaborators.
//!
//! - [`LinkEvent`]: what the radio stack delivers to the link (inbound data,
//!   transmit readiness, peer presence-line levels, connection changes).
//! - [`Notification`]: what the link delivers to the firmware above it
//!   (received bytes, acknowledgment, end of message, timeout, line edges),
//!   all through the single [`LinkHooks::notify`] entry point.

use crate::msg_queue::Chunk;

/// Event delivered by the radio stack
#[derive(Debug)]
pub enum LinkEvent<const N: usize> {
    /// A batch of inbound bytes; its length classifies it
    Received(Chunk<N>),
    /// The stack can accept another send
    TxReady,
    /// The peer reported a presence-line level
    LineLevel { port: u8, level: bool },
    /// A peer connected (or discovery completed on the client side)
    Connected,
    /// The peer went away
    Disconnected,
}

/// Signal delivered to the reception layer and the port manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// One received byte, in arrival order
    Byte(u8),
    /// A one-byte batch: the peer acknowledged the last transmission
    Ack,
    /// A short batch: the message is complete, stop expecting continuation
    Reset,
    /// The deadline expired while a transmission was outstanding
    Timeout,
    /// A presence line produced an armed edge
    Edge(u8),
}

/// Hooks implemented by the firmware above the link
pub trait LinkHooks {
    /// Receives every notification produced by the link
    fn notify(&mut self, notification: Notification);

    /// Whether a transmission is still waiting for its acknowledgment
    fn tx_locked(&self) -> bool;
}
