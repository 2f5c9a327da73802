//! One-shot encode and decode helpers.

use std::io::Write;

use crate::decoder::{Context, ValueBuilder};
use crate::encoder::MsgPackEncoder;
use crate::error::{EncodeError, MsgPackError};
use crate::options::{DecoderOptions, EncoderOptions};
use crate::value::MsgPackValue;

const PACK_TO_BUFFER_SIZE: usize = 8 * 1024;

/// Encodes `value` into a new byte vector.
pub fn packb(value: &MsgPackValue) -> Result<Vec<u8>, EncodeError> {
    MsgPackEncoder::new().encode(value)
}

pub fn packb_with(value: &MsgPackValue, options: EncoderOptions) -> Result<Vec<u8>, EncodeError> {
    MsgPackEncoder::with_options(options).encode(value)
}

/// Encodes `value` into `sink` and hands the sink back.
pub fn pack_to<W: Write>(value: &MsgPackValue, sink: W) -> Result<W, EncodeError> {
    let options = EncoderOptions {
        buffer_size: Some(PACK_TO_BUFFER_SIZE),
        ..EncoderOptions::default()
    };
    let mut encoder = MsgPackEncoder::to_writer_with_options(sink, options);
    encoder.write_any(value)?;
    encoder.into_inner()
}

/// Decodes exactly one value from `data`.
pub fn unpackb(data: &[u8]) -> Result<MsgPackValue, MsgPackError> {
    unpackb_with(data, &DecoderOptions::default())
}

/// Decodes exactly one value from `data` with the given options.
///
/// Length limits not set explicitly are derived from `data.len()`, since no
/// valid value can announce more items or bytes than the input holds.
/// Trailing bytes are [`MsgPackError::ExtraData`]; input that ends inside
/// the value is [`MsgPackError::UnexpectedEof`].
pub fn unpackb_with(data: &[u8], options: &DecoderOptions) -> Result<MsgPackValue, MsgPackError> {
    let sized = DecoderOptions {
        max_buffer_size: options.max_buffer_size.min(data.len()),
        ..options.clone()
    };
    let mut ctx = Context::new(&sized);
    let mut builder = ValueBuilder::new(options);
    let mut off = 0;
    match ctx.execute(&mut builder, data, &mut off)? {
        Some(value) if off == data.len() => Ok(value),
        Some(_) => Err(MsgPackError::ExtraData {
            consumed: off,
            remaining: data.len() - off,
        }),
        None => Err(MsgPackError::UnexpectedEof),
    }
}
