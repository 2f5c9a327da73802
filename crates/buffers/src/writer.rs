//! Binary buffer writer with auto-growing capacity.

use tracing::trace;

use crate::{BufferError, Output};

/// A binary buffer writer that grows automatically as needed.
///
/// This is the sink-less output: it never flushes anywhere, so running out
/// of room means allocating a larger buffer. Bytes written since the last
/// [`Writer::take`] (or [`Writer::reset`]) form the pending segment.
///
/// # Example
///
/// ```
/// use msgpack_buffers::{Output, Writer};
///
/// let mut writer = Writer::new();
/// writer.u8(0x01).unwrap();
/// writer.u8u16(0x02, 0x0304).unwrap();
/// assert_eq!(writer.take(), [0x01, 0x02, 0x03, 0x04]);
/// ```
pub struct Writer {
    /// The underlying byte buffer. Its length is the current capacity.
    pub uint8: Vec<u8>,
    /// Start of the pending segment.
    pub x0: usize,
    /// Current cursor position.
    pub x: usize,
    /// Allocation size when buffer needs to grow.
    alloc_size: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Default allocation size (64KB).
    pub const DEFAULT_ALLOC_SIZE: usize = 64 * 1024;

    /// Creates a new writer with default allocation size.
    pub fn new() -> Self {
        Self::with_alloc_size(Self::DEFAULT_ALLOC_SIZE)
    }

    /// Creates a new writer with custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            uint8: vec![0u8; alloc_size],
            x0: 0,
            x: 0,
            alloc_size,
        }
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.uint8.len()
    }

    /// Ensures the buffer has at least `capacity` bytes available.
    ///
    /// Growth keeps only the pending segment and at least doubles what is
    /// required to hold it plus the new bytes.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<(), BufferError> {
        let remaining = self.uint8.len() - self.x;
        if remaining < capacity {
            let total = self.x - self.x0;
            let total_required = total
                .checked_add(capacity)
                .ok_or(BufferError::OutOfMemory {
                    requested: usize::MAX,
                })?;
            let new_size = if total_required <= self.alloc_size {
                self.alloc_size
            } else {
                total_required
                    .checked_mul(2)
                    .ok_or(BufferError::OutOfMemory {
                        requested: total_required,
                    })?
            };
            self.grow(new_size)?;
        }
        Ok(())
    }

    fn grow(&mut self, new_size: usize) -> Result<(), BufferError> {
        let x0 = self.x0;
        let x = self.x;
        let mut new_buf = Vec::new();
        new_buf
            .try_reserve_exact(new_size)
            .map_err(|_| BufferError::OutOfMemory {
                requested: new_size,
            })?;
        new_buf.extend_from_slice(&self.uint8[x0..x]);
        new_buf.resize(new_size, 0);
        trace!(from = self.uint8.len(), to = new_size, "writer buffer grown");
        self.uint8 = new_buf;
        self.x = x - x0;
        self.x0 = 0;
        Ok(())
    }

    /// Discards the pending segment.
    pub fn reset(&mut self) {
        self.x = self.x0;
    }

    /// Returns a view of the pending segment without consuming it.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8[self.x0..self.x]
    }

    /// Returns the pending segment and starts a new one.
    pub fn take(&mut self) -> Vec<u8> {
        let result = self.uint8[self.x0..self.x].to_vec();
        self.x0 = self.x;
        result
    }
}

impl Output for Writer {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        let length = bytes.len();
        self.ensure_capacity(length)?;
        self.uint8[self.x..self.x + length].copy_from_slice(bytes);
        self.x += length;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BufferError> {
        Ok(())
    }

    fn buffered(&self) -> usize {
        self.x - self.x0
    }
}
