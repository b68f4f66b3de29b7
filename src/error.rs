//! # Link Errors
//!
//! Error taxonomy shared by the transport, the message queue and the
//! presence-line emulator.
//!
//! Timeouts are not errors: an expired deadline is a liveness signal
//! routed to the reception layer as [`Notification::Timeout`](crate::Notification).

use thiserror::Error;

use crate::channels::ChannelError;

/// Errors reported by link operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The outbound queue is at capacity; the caller decides to retry or drop
    #[error("outbound queue is full")]
    QueueFull,

    /// A single chunk was larger than the queue slot size
    #[error("chunk of {len} bytes exceeds the {max} byte slot")]
    ChunkTooLarge {
        /// Length of the rejected chunk
        len: usize,
        /// Maximum chunk length accepted by the queue
        max: usize,
    },

    /// The channel send primitive reported `would_block`
    #[error("channel cannot accept another send right now")]
    ChannelBusy,

    /// Presence-line index outside the configured line count
    #[error("presence line index {0} is out of range")]
    InvalidPortIndex(u8),

    /// The channel stack reported a fatal error
    #[error("channel stack fault")]
    ChannelFault,

    /// Transmission requested while no peer is connected
    #[error("no peer connected")]
    NotConnected,
}

impl From<ChannelError> for LinkError {
    fn from(error: ChannelError) -> Self {
        match error {
            ChannelError::WouldBlock => LinkError::ChannelBusy,
            ChannelError::Fault => LinkError::ChannelFault,
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn channel_errors_map_onto_link_errors() {
        assert_eq!(LinkError::from(ChannelError::WouldBlock), LinkError::ChannelBusy);
        assert_eq!(LinkError::from(ChannelError::Fault), LinkError::ChannelFault);
    }

    #[test]
    fn chunk_too_large_message_names_both_sizes() {
        let message = std::format!("{}", LinkError::ChunkTooLarge { len: 30, max: 20 });
        assert!(message.contains("30"));
        assert!(message.contains("20"));
    }
}
