//! The write capability shared by every encoder buffer.

use crate::BufferError;

/// Destination for encoded bytes.
///
/// Implementations decide what happens when their buffer is full: [`Writer`]
/// grows, [`SinkWriter`] flushes. The helpers below pack a tag byte together
/// with its big-endian payload so that each record reaches the buffer in a
/// single [`Output::write`] call.
///
/// [`Writer`]: crate::Writer
/// [`SinkWriter`]: crate::SinkWriter
pub trait Output {
    /// Appends `bytes` to the output.
    fn write(&mut self, bytes: &[u8]) -> Result<(), BufferError>;

    /// Pushes buffered bytes to the underlying sink, if there is one.
    fn flush(&mut self) -> Result<(), BufferError>;

    /// Number of bytes currently held in the buffer and not yet handed off.
    fn buffered(&self) -> usize;

    /// Writes a single byte.
    #[inline]
    fn u8(&mut self, val: u8) -> Result<(), BufferError> {
        self.write(&[val])
    }

    /// Writes a tag byte followed by one payload byte.
    #[inline]
    fn u8u8(&mut self, tag: u8, val: u8) -> Result<(), BufferError> {
        self.write(&[tag, val])
    }

    /// Writes a tag byte followed by a u16 (big-endian).
    #[inline]
    fn u8u16(&mut self, tag: u8, val: u16) -> Result<(), BufferError> {
        let [b0, b1] = val.to_be_bytes();
        self.write(&[tag, b0, b1])
    }

    /// Writes a tag byte followed by a u32 (big-endian).
    #[inline]
    fn u8u32(&mut self, tag: u8, val: u32) -> Result<(), BufferError> {
        let mut bytes = [tag; 5];
        bytes[1..].copy_from_slice(&val.to_be_bytes());
        self.write(&bytes)
    }

    /// Writes a tag byte followed by a u64 (big-endian).
    #[inline]
    fn u8u64(&mut self, tag: u8, val: u64) -> Result<(), BufferError> {
        let mut bytes = [tag; 9];
        bytes[1..].copy_from_slice(&val.to_be_bytes());
        self.write(&bytes)
    }

    /// Writes a tag byte followed by a f32 (big-endian).
    #[inline]
    fn u8f32(&mut self, tag: u8, val: f32) -> Result<(), BufferError> {
        self.u8u32(tag, val.to_bits())
    }

    /// Writes a tag byte followed by a f64 (big-endian).
    #[inline]
    fn u8f64(&mut self, tag: u8, val: f64) -> Result<(), BufferError> {
        self.u8u64(tag, val.to_bits())
    }

    /// Writes a raw byte slice.
    #[inline]
    fn buf(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.write(bytes)
    }
}
