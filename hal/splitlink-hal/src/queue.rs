//! Receive-side byte ring
//!
//! The queue a serial interrupt pushes into and the link driver drains.
//! Discarding is a read-pointer adjustment, not a copy, so throwing away
//! a half-duplex echo costs O(1) per contiguous chunk.
//!
//! The queue itself is not synchronized; share it with an interrupt inside
//! a critical-section mutex so [`InputQueue::reset`] is observed atomically.

/// Fixed-capacity byte ring
#[derive(Debug, Clone)]
pub struct InputQueue<const N: usize> {
    buffer: [u8; N],
    /// Index of the oldest byte
    read: usize,
    /// Number of queued bytes
    count: usize,
    /// Bytes dropped because the queue was full
    overruns: u32,
}

impl<const N: usize> Default for InputQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> InputQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            read: 0,
            count: 0,
            overruns: 0,
        }
    }

    /// Total capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of queued bytes
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bytes dropped on overflow since creation
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Queue one received byte
    ///
    /// Returns false (and counts an overrun) if the queue is full; the
    /// newest byte is the one dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.count == N {
            self.overruns = self.overruns.saturating_add(1);
            return false;
        }

        let write = (self.read + self.count) % N;
        self.buffer[write] = byte;
        self.count += 1;
        true
    }

    /// Take the oldest byte
    pub fn pop(&mut self) -> Option<u8> {
        if self.count == 0 {
            return None;
        }

        let byte = self.buffer[self.read];
        self.advance(1);
        Some(byte)
    }

    /// Move up to `buf.len()` queued bytes into `buf`
    ///
    /// Returns the number of bytes copied.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut copied = 0;

        while copied < buf.len() && self.count > 0 {
            let chunk = self.contiguous().min(buf.len() - copied);
            buf[copied..copied + chunk].copy_from_slice(&self.buffer[self.read..self.read + chunk]);
            self.advance(chunk);
            copied += chunk;
        }

        copied
    }

    /// Discard up to `n` queued bytes without copying them
    ///
    /// Returns the number of bytes discarded.
    pub fn skip(&mut self, n: usize) -> usize {
        let mut remaining = n.min(self.count);
        let discarded = remaining;

        while remaining > 0 {
            // Bytes before the buffer end, at most two rounds
            let chunk = self.contiguous().min(remaining);
            self.advance(chunk);
            remaining -= chunk;
        }

        discarded
    }

    /// Drop all queued bytes
    pub fn reset(&mut self) {
        self.read = 0;
        self.count = 0;
    }

    /// Queued bytes between the read pointer and the buffer end
    fn contiguous(&self) -> usize {
        self.count.min(N - self.read)
    }

    fn advance(&mut self, n: usize) {
        self.read = (self.read + n) % N;
        self.count -= n;
    }
}
