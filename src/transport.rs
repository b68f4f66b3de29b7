//! # Chunked Transport
//!
//! Byte-stream transport on top of a channel that only moves bounded chunks
//! and never signals transmit completion by itself.
//!
//! ## Transmit
//!
//! A buffer is split into chunks of at most the channel's negotiated payload
//! and pushed into the [`MessageQueue`]. How the queue drains depends on the
//! [`TxPacing`] of the link:
//!
//! - `Notified`: one chunk in flight; the next one leaves when the stack
//!   reports it is ready again ([`Transport::transmit_complete`]).
//! - `Cooldown`: every chunk is followed by a fixed busy-wait on the tick
//!   source, because nothing tells us when the stack is done with it.
//! - `Direct`: the channel takes whole buffers synchronously; nothing is
//!   queued and only the deadline is managed.
//!
//! Every accepted transmission re-arms the deadline.
//!
//! ## Receive
//!
//! Each inbound byte is forwarded individually, then the batch length alone
//! decides what the batch was (see [`classify`]). There is no framing bit, so
//! a genuine one-byte message is indistinguishable from an acknowledgment;
//! the heuristic is kept for compatibility with existing peers.

use log::{Level, log};

use crate::channels::LinkChannel;
use crate::deadline::Deadline;
use crate::events::{LinkHooks, Notification};
use crate::msg_queue::MessageQueue;
use crate::tick::{TickSource, busy_wait};
use crate::LinkError;

/// How queued chunks are paced onto the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPacing {
    /// Wait for the stack's ready event between chunks
    Notified,
    /// Busy-wait `ms` milliseconds after every chunk
    Cooldown { ms: u32 },
    /// Hand whole buffers straight to the channel
    Direct,
}

/// What an inbound batch turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxClass {
    /// Single byte: acknowledgment of our last transmission
    Ack,
    /// Short batch: a complete message
    Complete,
    /// Batch at the payload ceiling: more data follows
    Partial,
}

/// Classifies an inbound batch by its length
///
/// `len == 1` is an acknowledgment, anything shorter than
/// `max_payload - 1` is a complete message, everything else is partial.
///
/// # Example
/// ```rust
/// use nus_link::transport::{RxClass, classify};
///
/// assert_eq!(classify(1, 20), RxClass::Ack);
/// assert_eq!(classify(10, 20), RxClass::Complete);
/// assert_eq!(classify(19, 20), RxClass::Partial);
/// ```
pub const fn classify(len: usize, max_payload: usize) -> RxClass {
    if len == 1 {
        RxClass::Ack
    } else if len < max_payload.saturating_sub(1) {
        RxClass::Complete
    } else {
        RxClass::Partial
    }
}

/// Transport state: outbound queue, pacing and the link deadline
pub struct Transport<T: TickSource, const QUEUE: usize, const N: usize> {
    ticks: T,
    queue: MessageQueue<QUEUE, N>,
    deadline: Deadline,
    pacing: TxPacing,
    default_timeout_ms: u16,
    busy_retry_limit: u8,
    output_ready: bool,
    current_rx_byte: u8,
}

impl<T: TickSource, const QUEUE: usize, const N: usize> Transport<T, QUEUE, N> {
    pub fn new(ticks: T, pacing: TxPacing, default_timeout_ms: u16, busy_retry_limit: u8) -> Self {
        Self {
            ticks,
            queue: MessageQueue::new(),
            deadline: Deadline::new(),
            pacing,
            default_timeout_ms,
            busy_retry_limit,
            output_ready: true,
            current_rx_byte: 0,
        }
    }

    /// Splits `bytes` into chunks, queues them and starts draining
    ///
    /// # Errors
    /// * [`LinkError::QueueFull`] if the queue ran out of slots; chunks queued
    ///   before the failure stay queued
    /// * [`LinkError::ChannelBusy`] if the cooldown drain could not dispatch a
    ///   single chunk, or the direct channel refused the buffer
    /// * [`LinkError::ChannelFault`] if the channel faulted
    pub fn transmit<C: LinkChannel>(&mut self, channel: &mut C, bytes: &[u8]) -> Result<(), LinkError> {
        log!(Level::Debug, "Prepare {} bytes for sending", bytes.len());
        log::trace!("{:02x?}", bytes);

        match self.pacing {
            TxPacing::Direct => {
                channel.send(bytes).map_err(LinkError::from)?;
            }
            TxPacing::Notified => {
                self.enqueue_split(channel.max_payload(), bytes)?;
                self.dispatch_one(channel)?;
            }
            TxPacing::Cooldown { ms } => {
                self.enqueue_split(channel.max_payload(), bytes)?;
                self.drain_paced(channel, ms)?;
            }
        }

        self.arm_default_timeout();
        Ok(())
    }

    /// The channel is ready for another send
    pub fn transmit_complete<C: LinkChannel>(&mut self, channel: &mut C) -> Result<(), LinkError> {
        self.arm_default_timeout();
        match self.pacing {
            TxPacing::Notified => {
                self.output_ready = true;
                self.dispatch_one(channel)
            }
            TxPacing::Cooldown { ms } => self.drain_paced(channel, ms).map(|_| ()),
            TxPacing::Direct => Ok(()),
        }
    }

    /// Forwards an inbound batch byte by byte and acts on its classification
    pub fn receive<H: LinkHooks>(&mut self, bytes: &[u8], max_payload: usize, hooks: &mut H) -> RxClass {
        log!(Level::Debug, "Received {} bytes", bytes.len());
        log::trace!("{:02x?}", bytes);

        for &byte in bytes {
            self.current_rx_byte = byte;
            hooks.notify(Notification::Byte(byte));
        }

        let class = classify(bytes.len(), max_payload);
        match class {
            RxClass::Ack => {
                self.deadline.cancel();
                hooks.notify(Notification::Ack);
            }
            RxClass::Complete => hooks.notify(Notification::Reset),
            RxClass::Partial => self.arm_default_timeout(),
        }
        class
    }

    /// Re-arms the deadline; zero disables it
    pub fn reset_timeout(&mut self, duration_ms: u16) {
        self.deadline.arm(duration_ms as u32, &self.ticks);
    }

    /// Deadline callback entry point
    ///
    /// Returns whether the deadline fired. A fired deadline only reaches the
    /// reception layer as [`Notification::Timeout`] while it reports an
    /// outstanding transmission.
    pub fn poll_deadline<H: LinkHooks>(&mut self, hooks: &mut H) -> bool {
        if !self.deadline.poll(&self.ticks) {
            return false;
        }
        if hooks.tx_locked() {
            log!(Level::Debug, "Link timeout with transmission outstanding");
            hooks.notify(Notification::Timeout);
        }
        true
    }

    pub fn pending_chunks(&self) -> usize {
        self.queue.len()
    }

    pub fn is_output_ready(&self) -> bool {
        self.output_ready
    }

    pub fn is_deadline_armed(&self) -> bool {
        self.deadline.is_armed()
    }

    /// Last byte forwarded to the reception layer
    pub fn current_rx_byte(&self) -> u8 {
        self.current_rx_byte
    }

    pub fn pacing(&self) -> TxPacing {
        self.pacing
    }

    /// Drops queued chunks and returns to the ready state
    pub fn reset(&mut self) {
        self.queue.clear();
        self.output_ready = true;
        self.deadline.cancel();
    }

    fn arm_default_timeout(&mut self) {
        self.deadline.arm(self.default_timeout_ms as u32, &self.ticks);
    }

    fn enqueue_split(&mut self, max_payload: usize, bytes: &[u8]) -> Result<(), LinkError> {
        let chunk_size = max_payload.min(N);
        if chunk_size == 0 {
            return Err(LinkError::ChunkTooLarge { len: bytes.len(), max: 0 });
        }
        for piece in bytes.chunks(chunk_size) {
            if let Err(error) = self.queue.enqueue(piece) {
                log!(Level::Warn, "Message could not be enqueued, {} chunks pending", self.queue.len());
                return Err(error);
            }
        }
        Ok(())
    }

    /// Sends the oldest chunk; `Ok(false)` means the queue was empty
    fn send_next<C: LinkChannel>(&mut self, channel: &mut C) -> Result<bool, LinkError> {
        let Some(chunk) = self.queue.peek() else {
            return Ok(false);
        };
        log!(Level::Debug, "Sending {} bytes", chunk.len());
        if let Err(error) = channel.send(chunk) {
            let error = LinkError::from(error);
            if error == LinkError::ChannelFault {
                log!(Level::Error, "Channel fault while sending {} bytes", chunk.len());
            }
            return Err(error);
        }
        self.queue.pop();
        Ok(true)
    }

    fn dispatch_one<C: LinkChannel>(&mut self, channel: &mut C) -> Result<(), LinkError> {
        if !self.output_ready {
            return Ok(());
        }
        match self.send_next(channel) {
            Ok(true) => {
                // No sending until the stack reports this one done
                self.output_ready = false;
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(LinkError::ChannelBusy) => {
                log!(Level::Debug, "Channel busy, waiting for ready event");
                self.output_ready = false;
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn drain_paced<C: LinkChannel>(&mut self, channel: &mut C, cooldown_ms: u32) -> Result<usize, LinkError> {
        let mut dispatched = 0;
        let mut busy_retries: u8 = 0;
        loop {
            match self.send_next(channel) {
                Ok(false) => return Ok(dispatched),
                Ok(true) => {
                    dispatched += 1;
                    busy_retries = 0;
                }
                Err(LinkError::ChannelBusy) => {
                    busy_retries = busy_retries.saturating_add(1);
                    if busy_retries > self.busy_retry_limit {
                        log!(
                            Level::Warn,
                            "Channel stayed busy, {} chunks left queued after {} sent",
                            self.queue.len(),
                            dispatched
                        );
                        return if dispatched > 0 { Ok(dispatched) } else { Err(LinkError::ChannelBusy) };
                    }
                }
                Err(error) => return Err(error),
            }
            // Wait for resources to cool down, there is no transmit complete
            busy_wait(&self.ticks, cooldown_ms);
        }
    }
}
