//! Channel abstraction
//!
//! The channel is the notification-based, MTU-limited link to the peer
//! firmware. Bring-up, discovery and characteristic registration belong to
//! the radio stack; the link only needs the primitives below.
//!
//! - `echo`: loopback channel that records sends and can replay them as
//!   inbound data, used for testing without a radio

pub mod echo;

pub use echo::EchoChannel;

/// Failure of a channel primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The stack cannot take another send right now
    WouldBlock,
    /// The stack reported a fatal error
    Fault,
}

/// Primitives consumed from the radio stack
pub trait LinkChannel {
    /// Hands one chunk (at most [`max_payload`](Self::max_payload) bytes) to the stack
    fn send(&mut self, bytes: &[u8]) -> Result<(), ChannelError>;

    /// Negotiated maximum payload of a single send
    fn max_payload(&self) -> usize;

    /// Mirrors the primary presence line's level to the peer
    fn publish_line_level(&mut self, level: bool) -> Result<(), ChannelError>;
}
