//! Streaming unpacker over fed chunks or a reader.

use std::io::{self, Read};

use tracing::{debug, trace};

use crate::decoder::{self, Context, SkipBuilder, ValueBuilder};
use crate::error::MsgPackError;
use crate::options::DecoderOptions;
use crate::value::MsgPackValue;

type HeaderRead = fn(&[u8], &mut usize) -> Result<Option<u32>, MsgPackError>;

/// Decodes a stream of concatenated MessagePack values.
///
/// Bytes arrive either through [`Unpacker::feed`] or from the reader given
/// to [`Unpacker::from_reader`]. A value cut off at the end of the buffered
/// bytes stays in progress and resumes when more bytes arrive.
///
/// # Example
///
/// ```
/// use msgpack_codec::{MsgPackValue, Unpacker};
///
/// let mut unpacker = Unpacker::new();
/// unpacker.feed(&[0x01, 0xa3, b'f', b'o']).unwrap();
/// assert_eq!(unpacker.unpack().unwrap(), Some(MsgPackValue::Integer(1)));
/// assert_eq!(unpacker.unpack().unwrap(), None);
/// unpacker.feed(b"o").unwrap();
/// assert_eq!(unpacker.unpack().unwrap(), Some(MsgPackValue::from("foo")));
/// ```
pub struct Unpacker<R = io::Empty> {
    buffer: Vec<u8>,
    /// Parse position in `buffer`; everything before it is consumed.
    pos: usize,
    /// Total bytes consumed since creation.
    consumed: u64,
    ctx: Context<ValueBuilder>,
    skipper: Context<SkipBuilder>,
    builder: ValueBuilder,
    max_buffer_size: usize,
    read_size: usize,
    source: Option<R>,
    eof: bool,
    /// Set once iteration hits an error; the iterator then stays exhausted.
    failed: bool,
}

impl Default for Unpacker<io::Empty> {
    fn default() -> Self {
        Self::new()
    }
}

impl Unpacker<io::Empty> {
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self::build(None, &options)
    }
}

impl<R: Read> Unpacker<R> {
    pub fn from_reader(source: R) -> Self {
        Self::from_reader_with_options(source, DecoderOptions::default())
    }

    pub fn from_reader_with_options(source: R, options: DecoderOptions) -> Self {
        Self::build(Some(source), &options)
    }

    fn build(source: Option<R>, options: &DecoderOptions) -> Self {
        Self {
            buffer: Vec::new(),
            pos: 0,
            consumed: 0,
            ctx: Context::new(options),
            skipper: Context::new(options),
            builder: ValueBuilder::new(options),
            max_buffer_size: options.max_buffer_size,
            read_size: options.read_size.clamp(1, options.max_buffer_size.max(1)),
            source,
            eof: false,
            failed: false,
        }
    }

    /// Replaces the value builder, e.g. to install an ext hook.
    pub fn with_builder(mut self, builder: ValueBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Appends bytes to the internal buffer.
    ///
    /// Fails with [`MsgPackError::BufferFull`] when the unconsumed bytes
    /// would exceed `max_buffer_size`; nothing is appended in that case.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), MsgPackError> {
        let unconsumed = self.buffered();
        if unconsumed.saturating_add(data.len()) > self.max_buffer_size {
            debug!(
                unconsumed,
                len = data.len(),
                max = self.max_buffer_size,
                "refusing feed"
            );
            return Err(MsgPackError::BufferFull);
        }
        self.compact();
        self.buffer
            .try_reserve(data.len())
            .map_err(|_| MsgPackError::OutOfMemory)?;
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Decodes the next value, or returns `Ok(None)` if more bytes are
    /// needed.
    ///
    /// With a reader, `Ok(None)` means the reader is exhausted between
    /// values; running out in the middle of a value is
    /// [`MsgPackError::UnexpectedEof`].
    pub fn unpack(&mut self) -> Result<Option<MsgPackValue>, MsgPackError> {
        if !self.skipper.is_idle() {
            return Err(MsgPackError::ReadInProgress);
        }
        loop {
            let mut off = self.pos;
            let result = self.ctx.execute(&mut self.builder, &self.buffer, &mut off);
            self.advance(off);
            if let Some(value) = result? {
                return Ok(Some(value));
            }
            if !self.fill()? {
                return self.out_of_data(self.ctx.is_idle());
            }
        }
    }

    /// Alias of [`Unpacker::unpack`].
    pub fn next_value(&mut self) -> Result<Option<MsgPackValue>, MsgPackError> {
        self.unpack()
    }

    /// Steps over the next value without building it. Returns `false` if
    /// more bytes are needed.
    pub fn skip_value(&mut self) -> Result<bool, MsgPackError> {
        if !self.ctx.is_idle() {
            return Err(MsgPackError::ReadInProgress);
        }
        loop {
            let mut off = self.pos;
            let result = self.skipper.execute(&mut SkipBuilder, &self.buffer, &mut off);
            self.advance(off);
            if result?.is_some() {
                return Ok(true);
            }
            if !self.fill()? {
                return self.out_of_data(self.skipper.is_idle()).map(|_: Option<()>| false);
            }
        }
    }

    /// Reads only an array header and returns its element count.
    pub fn read_array_header(&mut self) -> Result<Option<u32>, MsgPackError> {
        self.read_header(decoder::read_array_header)
    }

    /// Reads only a map header and returns its entry count.
    pub fn read_map_header(&mut self) -> Result<Option<u32>, MsgPackError> {
        self.read_header(decoder::read_map_header)
    }

    fn read_header(&mut self, read: HeaderRead) -> Result<Option<u32>, MsgPackError> {
        self.ensure_idle()?;
        loop {
            let mut off = self.pos;
            if let Some(count) = read(&self.buffer, &mut off)? {
                self.advance(off);
                return Ok(Some(count));
            }
            if !self.fill()? {
                return self.out_of_data(self.buffered() == 0);
            }
        }
    }

    /// Takes up to `n` raw bytes from the stream.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, MsgPackError> {
        self.ensure_idle()?;
        while self.buffered() < n && self.fill()? {}
        let end = self.pos + n.min(self.buffered());
        let bytes = self.buffer[self.pos..end].to_vec();
        self.advance(end);
        Ok(bytes)
    }

    /// Total bytes consumed so far.
    pub fn tell(&self) -> u64 {
        self.consumed
    }

    /// Bytes held but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.pos
    }

    fn ensure_idle(&self) -> Result<(), MsgPackError> {
        if self.ctx.is_idle() && self.skipper.is_idle() {
            Ok(())
        } else {
            Err(MsgPackError::ReadInProgress)
        }
    }

    fn advance(&mut self, off: usize) {
        self.consumed += (off - self.pos) as u64;
        self.pos = off;
    }

    fn compact(&mut self) {
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }
    }

    fn out_of_data<T>(&self, idle: bool) -> Result<Option<T>, MsgPackError> {
        if self.eof && !idle {
            return Err(MsgPackError::UnexpectedEof);
        }
        Ok(None)
    }

    /// Pulls the next chunk from the reader. Returns `false` when there is
    /// no reader or it is exhausted.
    fn fill(&mut self) -> Result<bool, MsgPackError> {
        if self.source.is_none() || self.eof {
            return Ok(false);
        }
        self.compact();
        let room = self.max_buffer_size.saturating_sub(self.buffer.len());
        if room == 0 {
            debug!(max = self.max_buffer_size, "buffer full while reading");
            return Err(MsgPackError::BufferFull);
        }
        let want = self.read_size.min(room);
        let start = self.buffer.len();
        self.buffer
            .try_reserve(want)
            .map_err(|_| MsgPackError::OutOfMemory)?;
        self.buffer.resize(start + want, 0);
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        let read = loop {
            match source.read(&mut self.buffer[start..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buffer.truncate(start);
                    return Err(err.into());
                }
            }
        };
        self.buffer.truncate(start + read);
        trace!(read, "read from source");
        if read == 0 {
            self.eof = true;
            return Ok(false);
        }
        Ok(true)
    }
}

impl<R: Read> Iterator for Unpacker<R> {
    type Item = Result<MsgPackValue, MsgPackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.unpack().transpose();
        if matches!(result, Some(Err(_))) {
            self.failed = true;
        }
        result
    }
}
