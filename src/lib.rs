#![cfg_attr(not(feature = "std"), no_std)]

//! # nus-link
//!
//! Turns an unreliable, MTU-limited notification channel (a BLE UART-style
//! service) into:
//!
//! - a byte-stream transport with chunking, send pacing and
//!   acknowledgment detection from received lengths, and
//! - a small set of emulated edge-triggered presence lines used for link
//!   presence and handshake detection.
//!
//! ## Architecture
//!
//! - [`Link`]: the facade owned by the firmware; it holds the channel, the
//!   [`Transport`](transport::Transport) and the
//!   [`PresenceLines`](presence::PresenceLines) and exposes the stable
//!   function-level contract (`transmit`, `transmit_complete`, line
//!   operations, `reset_timeout`).
//! - [`LinkEvent`]: everything the radio stack reports, delivered through
//!   [`Link::dispatch`].
//! - [`Notification`]: everything the link reports upward, delivered
//!   through [`LinkHooks::notify`].
//! - [`link_task`]: optional embassy driver that feeds a link from queues.
//!
//! All state is explicitly owned and threaded through handler calls. The
//! handlers are run-to-completion and assume a single logical thread; the
//! only wait is the cooldown busy-wait of the paced drain.

pub mod channels;
pub mod deadline;
mod error;
mod events;
pub mod link_task;
pub mod msg_queue;
pub mod presence;
pub mod tick;
pub mod transport;

#[cfg(all(test, feature = "std"))]
mod test_support;

use log::{Level, log};

pub use channels::{ChannelError, LinkChannel};
pub use error::LinkError;
pub use events::{LinkEvent, LinkHooks, Notification};
pub use msg_queue::Chunk;
pub use presence::{ArmedEdge, LineId, MAX_PRESENCE_LINES};
pub use tick::TickSource;
pub use transport::{RxClass, TxPacing};

use presence::PresenceLines;
use transport::Transport;

/// Deadline re-armed after every transmission and partial reception (ms)
pub const DEFAULT_TIMEOUT_MS: u16 = 200;

/// Pause between chunks when the stack has no transmit-complete event (ms)
pub const TX_COOLDOWN_MS: u32 = 25;

/// Value at which the millisecond tick counter wraps
pub const DEFAULT_WRAP_MAX_MS: u32 = 250;

/// Consecutive `would_block` sends tolerated by the cooldown drain
pub const DEFAULT_BUSY_RETRY_LIMIT: u8 = 8;

/// Configuration of a link
///
/// Constructed once at startup; [`Link::new`] takes it apart.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfiguration {
    /// How queued chunks are paced onto the channel
    pub pacing: TxPacing,
    /// Deadline used after transmissions and partial receptions, in ms
    pub default_timeout_ms: u16,
    /// Reject transmissions while no peer is connected
    pub require_connection: bool,
    /// Consecutive busy sends tolerated before the cooldown drain gives up
    pub busy_retry_limit: u8,
}

impl LinkConfiguration {
    /// Peripheral side: the stack signals readiness for the next chunk
    pub const fn server() -> Self {
        Self {
            pacing: TxPacing::Notified,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            require_connection: true,
            busy_retry_limit: DEFAULT_BUSY_RETRY_LIMIT,
        }
    }

    /// Central side: no readiness event, chunks are paced by a cooldown
    pub const fn client() -> Self {
        Self {
            pacing: TxPacing::Cooldown { ms: TX_COOLDOWN_MS },
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            require_connection: false,
            busy_retry_limit: DEFAULT_BUSY_RETRY_LIMIT,
        }
    }

    /// Synchronous channel that takes whole buffers
    pub const fn direct() -> Self {
        Self {
            pacing: TxPacing::Direct,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            require_connection: false,
            busy_retry_limit: DEFAULT_BUSY_RETRY_LIMIT,
        }
    }
}

impl Default for LinkConfiguration {
    fn default() -> Self {
        Self::client()
    }
}

/// A link endpoint
///
/// `QUEUE` outbound chunk slots of at most `N` bytes each, `LINES`
/// emulated presence lines.
///
/// # Example
/// ```rust
/// use nus_link::channels::EchoChannel;
/// use nus_link::tick::EmbassyTicks;
/// use nus_link::{LineId, Link, LinkConfiguration};
///
/// let channel = EchoChannel::<20, 8>::new(20);
/// let mut link: Link<_, _, 4, 20, 1> =
///     Link::new(channel, EmbassyTicks::default(), LinkConfiguration::direct(), [LineId::default()]);
///
/// link.transmit(&[1, 2, 3]).unwrap();
/// assert_eq!(link.channel().sent_count(), 1);
/// ```
pub struct Link<C: LinkChannel, T: TickSource, const QUEUE: usize, const N: usize, const LINES: usize> {
    channel: C,
    transport: Transport<T, QUEUE, N>,
    lines: PresenceLines<LINES>,
    require_connection: bool,
    connected: bool,
}

impl<C: LinkChannel, T: TickSource, const QUEUE: usize, const N: usize, const LINES: usize> Link<C, T, QUEUE, N, LINES> {
    pub fn new(channel: C, ticks: T, config: LinkConfiguration, line_ids: [LineId; LINES]) -> Self {
        let LinkConfiguration {
            pacing,
            default_timeout_ms,
            require_connection,
            busy_retry_limit,
        } = config;

        Self {
            channel,
            transport: Transport::new(ticks, pacing, default_timeout_ms, busy_retry_limit),
            lines: PresenceLines::new(line_ids),
            require_connection,
            connected: false,
        }
    }

    /// Puts every presence line in its default state and mirrors line 0
    pub fn start(&mut self) -> Result<(), LinkError> {
        for port in 0..LINES as u8 {
            self.lines.set_default(port, &mut self.channel)?;
        }
        log!(
            Level::Info,
            "Link started: {:?} pacing, {} presence lines",
            self.transport.pacing(),
            LINES
        );
        Ok(())
    }

    /// Queues `bytes` for transmission and starts draining
    ///
    /// # Errors
    /// * [`LinkError::NotConnected`] if a connection is required and absent
    /// * otherwise as [`Transport::transmit`](transport::Transport::transmit)
    pub fn transmit(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.require_connection && !self.connected {
            log!(Level::Info, "No peer connected, dropping {} bytes", bytes.len());
            return Err(LinkError::NotConnected);
        }
        self.transport.transmit(&mut self.channel, bytes)
    }

    /// The channel can accept another send
    pub fn transmit_complete(&mut self) -> Result<(), LinkError> {
        self.transport.transmit_complete(&mut self.channel)
    }

    pub fn push_line(&mut self, port: u8) -> Result<(), LinkError> {
        self.lines.push(port, &mut self.channel)
    }

    pub fn set_line_default(&mut self, port: u8) -> Result<(), LinkError> {
        self.lines.set_default(port, &mut self.channel)
    }

    pub fn set_line_reverse(&mut self, port: u8) {
        self.lines.set_reverse(port)
    }

    pub fn get_line_state(&self, port: u8) -> bool {
        self.lines.get_state(port)
    }

    /// Identity registered for a presence line
    pub fn line_id(&self, port: u8) -> Option<LineId> {
        self.lines.line(port).ok().map(|line| line.id())
    }

    /// Re-arms the link deadline; zero disables it
    pub fn reset_timeout(&mut self, duration_ms: u16) {
        self.transport.reset_timeout(duration_ms)
    }

    /// Handles one event from the radio stack
    pub fn dispatch<H: LinkHooks>(&mut self, event: LinkEvent<N>, hooks: &mut H) -> Result<(), LinkError> {
        match event {
            LinkEvent::Received(bytes) => {
                let max_payload = self.channel.max_payload();
                self.transport.receive(&bytes, max_payload, hooks);
                Ok(())
            }
            LinkEvent::TxReady => self.transmit_complete(),
            LinkEvent::LineLevel { port, level } => {
                self.lines.on_remote_update(port, level, hooks);
                Ok(())
            }
            LinkEvent::Connected => {
                log!(Level::Info, "Peer connected");
                self.connected = true;
                Ok(())
            }
            LinkEvent::Disconnected => {
                log!(Level::Info, "Peer disconnected, dropping {} queued chunks", self.transport.pending_chunks());
                self.connected = false;
                self.transport.reset();
                Ok(())
            }
        }
    }

    /// Deadline callback; returns whether the deadline fired
    pub fn poll_timeout<H: LinkHooks>(&mut self, hooks: &mut H) -> bool {
        self.transport.poll_deadline(hooks)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn pending_chunks(&self) -> usize {
        self.transport.pending_chunks()
    }

    pub fn is_timeout_armed(&self) -> bool {
        self.transport.is_deadline_armed()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}
