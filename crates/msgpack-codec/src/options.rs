//! Encoder and decoder options.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ENCODE_DEPTH, DEFAULT_MAX_BUFFER_SIZE, DEFAULT_MAX_DEPTH, DEFAULT_READ_SIZE,
    MAX_WIRE_LEN,
};

/// Options controlling MessagePack encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// Use the bin family (0xc4..0xc6) for binary payloads and allow the
    /// str8 tag. When `false`, binary payloads are written with raw string
    /// tags and str8 is never emitted, for readers of the old format.
    pub use_bin_type: bool,
    /// Write 64-bit floats as float32.
    pub use_single_float: bool,
    /// Start a fresh segment after every [`encode`] call.
    ///
    /// [`encode`]: crate::MsgPackEncoder::encode
    pub autoreset: bool,
    /// Initial buffer size. `None` picks the output's own default: 1MB for
    /// sinks, 64KB for the growable buffer.
    pub buffer_size: Option<usize>,
    /// Longest str payload the encoder accepts.
    pub max_str_len: usize,
    /// Longest bin payload the encoder accepts.
    pub max_bin_len: usize,
    /// Deepest container nesting `write_any` will follow.
    pub max_depth: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            use_bin_type: true,
            use_single_float: false,
            autoreset: true,
            buffer_size: None,
            max_str_len: MAX_WIRE_LEN,
            max_bin_len: MAX_WIRE_LEN,
            max_depth: DEFAULT_ENCODE_DEPTH,
        }
    }
}

/// Options controlling MessagePack decoding.
///
/// The per-kind length limits default to `None`, which derives them from
/// `max_buffer_size`: str, bin and array counts may use the whole buffer,
/// ext payloads one byte less (the typecode is buffered with them), map
/// counts half of it (every entry takes at least two bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Deliver str payloads as bin instead of validating UTF-8.
    pub raw: bool,
    /// Only accept str or bin map keys.
    pub strict_map_key: bool,
    /// Decode ext type -1 into [`Timestamp`](crate::Timestamp).
    pub timestamp: bool,
    /// Deepest container nesting accepted.
    pub max_depth: usize,
    /// Cap on unconsumed bytes an [`Unpacker`](crate::Unpacker) will hold.
    pub max_buffer_size: usize,
    /// Bytes an [`Unpacker`](crate::Unpacker) reads from its source at once.
    pub read_size: usize,
    pub max_str_len: Option<usize>,
    pub max_bin_len: Option<usize>,
    pub max_ext_len: Option<usize>,
    pub max_array_len: Option<usize>,
    pub max_map_len: Option<usize>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            raw: false,
            strict_map_key: true,
            timestamp: true,
            max_depth: DEFAULT_MAX_DEPTH,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            read_size: DEFAULT_READ_SIZE,
            max_str_len: None,
            max_bin_len: None,
            max_ext_len: None,
            max_array_len: None,
            max_map_len: None,
        }
    }
}

impl DecoderOptions {
    /// Sets `max_buffer_size` and clears explicit length limits so they are
    /// derived from it again.
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self.max_str_len = None;
        self.max_bin_len = None;
        self.max_ext_len = None;
        self.max_array_len = None;
        self.max_map_len = None;
        self
    }

    /// Resolves the effective limits enforced by the decoder.
    pub fn limits(&self) -> Limits {
        let size = self.max_buffer_size;
        Limits {
            depth: self.max_depth,
            str_len: self.max_str_len.unwrap_or(size),
            bin_len: self.max_bin_len.unwrap_or(size),
            ext_len: self.max_ext_len.unwrap_or(size.saturating_sub(1)),
            array_len: self.max_array_len.unwrap_or(size),
            map_len: self.max_map_len.unwrap_or(size / 2),
        }
    }
}

/// Effective decoder limits, checked against every length field as it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub depth: usize,
    pub str_len: usize,
    pub bin_len: usize,
    pub ext_len: usize,
    pub array_len: usize,
    pub map_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        DecoderOptions::default().limits()
    }
}
