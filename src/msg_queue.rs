//! # Message Queue
//!
//! Fixed-capacity FIFO of outbound chunks. The queue owns the only mutable
//! copy of pending transmit data: bytes are copied in on enqueue and moved out
//! on pop.
//!
//! Enqueueing past capacity fails immediately and leaves the queue untouched;
//! there is no blocking, coalescing or prioritisation.

use heapless::{Deque, Vec};
use log::{Level, log};

use crate::LinkError;

/// Contiguous byte span of at most `N` bytes
pub type Chunk<const N: usize> = Vec<u8, N>;

/// Bounded FIFO of pending chunks
///
/// `CAPACITY` is the number of slots, `N` the largest chunk a slot holds.
pub struct MessageQueue<const CAPACITY: usize, const N: usize> {
    slots: Deque<Chunk<N>, CAPACITY>,
}

impl<const CAPACITY: usize, const N: usize> Default for MessageQueue<CAPACITY, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize, const N: usize> MessageQueue<CAPACITY, N> {
    pub const fn new() -> Self {
        Self { slots: Deque::new() }
    }

    /// Copies `bytes` into the next free slot
    ///
    /// # Errors
    /// * [`LinkError::ChunkTooLarge`] if `bytes` does not fit a slot
    /// * [`LinkError::QueueFull`] if every slot is taken
    pub fn enqueue(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if bytes.len() > N {
            return Err(LinkError::ChunkTooLarge { len: bytes.len(), max: N });
        }
        if self.slots.is_full() {
            log!(Level::Warn, "Message queue full, rejecting {} byte chunk", bytes.len());
            return Err(LinkError::QueueFull);
        }

        let chunk = Chunk::<N>::from_slice(bytes).map_err(|_| LinkError::ChunkTooLarge { len: bytes.len(), max: N })?;
        self.slots.push_back(chunk).map_err(|_| LinkError::QueueFull)
    }

    /// Oldest chunk, left in place
    pub fn peek(&self) -> Option<&Chunk<N>> {
        self.slots.front()
    }

    /// Removes and returns the oldest chunk
    pub fn pop(&mut self) -> Option<Chunk<N>> {
        self.slots.pop_front()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }

    /// Drops every pending chunk
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
