//! Fixed-capacity buffer that flushes into a byte sink.

use std::io::Write;

use tracing::{debug, trace};

use crate::{BufferError, Output};

/// A fixed-capacity buffer in front of a [`Write`] sink.
///
/// Writes that fit are copied into the buffer. A write that does not fit
/// fills the buffer to capacity, flushes it, and then either copies the
/// remainder into the emptied buffer or, when the remainder alone is at
/// least as large as the buffer, hands it straight to the sink.
///
/// Bytes already flushed are never taken back: after an error the sink may
/// hold a truncated stream.
///
/// # Example
///
/// ```
/// use msgpack_buffers::{Output, SinkWriter};
///
/// let mut out = SinkWriter::with_capacity(Vec::new(), 4);
/// out.write(&[1, 2, 3]).unwrap();
/// assert!(out.get_ref().is_empty());
/// out.write(&[4, 5]).unwrap();
/// assert_eq!(out.get_ref(), &[1, 2, 3, 4]);
/// assert_eq!(out.into_inner().unwrap(), vec![1, 2, 3, 4, 5]);
/// ```
pub struct SinkWriter<W: Write> {
    buf: Box<[u8]>,
    len: usize,
    sink: W,
}

impl<W: Write> SinkWriter<W> {
    /// Default buffer capacity (1MB).
    pub const DEFAULT_CAPACITY: usize = 1024 * 1024;

    pub fn new(sink: W) -> Self {
        Self::with_capacity(sink, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(sink: W, capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            sink,
        }
    }

    /// Buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Flushes buffered bytes and returns the sink.
    pub fn into_inner(mut self) -> Result<W, BufferError> {
        Output::flush(&mut self)?;
        Ok(self.sink)
    }

    fn flush_buffer(&mut self) -> Result<(), BufferError> {
        if self.len > 0 {
            trace!(len = self.len, "flushing buffer to sink");
            self.sink.write_all(&self.buf[..self.len])?;
            self.len = 0;
        }
        Ok(())
    }
}

impl<W: Write> Output for SinkWriter<W> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        let capacity = self.buf.len();
        let mut data = bytes;
        if self.len + data.len() > capacity {
            let rem = capacity - self.len;
            self.buf[self.len..].copy_from_slice(&data[..rem]);
            self.len = capacity;
            data = &data[rem..];
            self.flush_buffer()?;

            if data.len() >= capacity {
                debug!(len = data.len(), capacity, "bypassing buffer for large write");
                self.sink.write_all(data)?;
                return Ok(());
            }
        }
        self.buf[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BufferError> {
        self.flush_buffer()?;
        self.sink.flush()?;
        Ok(())
    }

    fn buffered(&self) -> usize {
        self.len
    }
}
