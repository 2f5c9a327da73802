//! MessagePack error types.

use std::fmt;

use msgpack_buffers::BufferError;
use thiserror::Error;

/// The length-prefixed kinds whose sizes are subject to limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthKind {
    Str,
    Bin,
    Ext,
    Array,
    Map,
}

impl fmt::Display for LengthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LengthKind::Str => "str",
            LengthKind::Bin => "bin",
            LengthKind::Ext => "ext",
            LengthKind::Array => "array",
            LengthKind::Map => "map",
        })
    }
}

/// Errors raised while encoding.
///
/// Length and depth checks run before anything is written, so those two
/// leave the output untouched. Buffer errors may leave a partial record in
/// a sink.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{kind} length {len} exceeds limit {max}")]
    LengthExceeded {
        kind: LengthKind,
        len: usize,
        max: usize,
    },
    #[error("nesting depth exceeds limit {0}")]
    DepthExceeded(usize),
    #[error("integer {0} does not fit in 64 bits")]
    IntegerOverflow(i128),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Errors raised while decoding.
///
/// Running out of input is not an error at the [`Context`] level; it is
/// reported as `Ok(None)`. [`MsgPackError::UnexpectedEof`] only comes from
/// entry points that know no more input will arrive.
///
/// [`Context`]: crate::decoder::Context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MsgPackError {
    #[error("invalid type marker 0x{0:02x}")]
    InvalidByte(u8),
    #[error("unexpected type, expected {0}")]
    UnexpectedType(&'static str),
    #[error("nesting depth exceeds limit {0}")]
    StackDepthExceeded(usize),
    #[error("{kind} length {len} exceeds limit {max}")]
    LengthExceeded {
        kind: LengthKind,
        len: usize,
        max: usize,
    },
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("map key must be str or bin")]
    InvalidMapKey,
    #[error("timestamp payload must be 4, 8 or 12 bytes, got {0}")]
    InvalidTimestamp(usize),
    #[error("timestamp nanoseconds {0} out of range")]
    InvalidNanoseconds(u64),
    #[error("timestamp out of representable range")]
    TimestampOutOfRange,
    #[error("out of memory")]
    OutOfMemory,
    #[error("builder error: {0}")]
    Builder(String),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("{remaining} bytes of extra data after value ending at offset {consumed}")]
    ExtraData { consumed: usize, remaining: usize },
    #[error("buffer full")]
    BufferFull,
    #[error("another read is in progress")]
    ReadInProgress,
    #[error("io error: {0}")]
    Io(String),
}

impl From<BufferError> for MsgPackError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer => MsgPackError::UnexpectedEof,
            BufferError::OutOfMemory { .. } => MsgPackError::OutOfMemory,
            BufferError::Sink(err) => MsgPackError::Io(err.to_string()),
        }
    }
}

impl From<std::io::Error> for MsgPackError {
    fn from(err: std::io::Error) -> Self {
        MsgPackError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = MsgPackError::LengthExceeded {
            kind: LengthKind::Str,
            len: 10,
            max: 4,
        };
        assert_eq!(err.to_string(), "str length 10 exceeds limit 4");
        assert_eq!(
            MsgPackError::InvalidByte(0xc1).to_string(),
            "invalid type marker 0xc1"
        );
    }

    #[test]
    fn test_buffer_error_conversion() {
        assert_eq!(
            MsgPackError::from(BufferError::EndOfBuffer),
            MsgPackError::UnexpectedEof
        );
        let err: EncodeError = BufferError::OutOfMemory { requested: 8 }.into();
        assert!(matches!(
            err,
            EncodeError::Buffer(BufferError::OutOfMemory { requested: 8 })
        ));
    }
}
