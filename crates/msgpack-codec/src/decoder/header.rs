//! Container-header reads.
//!
//! These read just the tag and count of an array or map, leaving the items
//! for the caller to decode one at a time.

use msgpack_buffers::Reader;

use crate::constants::{ARRAY16, ARRAY32, FIXARRAY, FIXMAP, MAP16, MAP32};
use crate::error::MsgPackError;

/// Reads an array header at `data[*off..]`.
///
/// Returns the element count and advances `*off` past the header, or
/// `Ok(None)` with `*off` unchanged if the header is not complete yet.
/// Any other type is [`MsgPackError::UnexpectedType`].
pub fn read_array_header(data: &[u8], off: &mut usize) -> Result<Option<u32>, MsgPackError> {
    read_container_header(data, off, FIXARRAY, ARRAY16, ARRAY32, "array")
}

/// Reads a map header at `data[*off..]`. See [`read_array_header`].
pub fn read_map_header(data: &[u8], off: &mut usize) -> Result<Option<u32>, MsgPackError> {
    read_container_header(data, off, FIXMAP, MAP16, MAP32, "map")
}

fn read_container_header(
    data: &[u8],
    off: &mut usize,
    fixed: u8,
    tag16: u8,
    tag32: u8,
    expected: &'static str,
) -> Result<Option<u32>, MsgPackError> {
    let mut reader = Reader::from_slice(data, *off, data.len());
    let Ok(byte) = reader.u8() else {
        return Ok(None);
    };
    let count = if byte & 0xf0 == fixed {
        Ok(u32::from(byte & 0x0f))
    } else if byte == tag16 {
        reader.u16().map(u32::from)
    } else if byte == tag32 {
        reader.u32()
    } else {
        return Err(MsgPackError::UnexpectedType(expected));
    };
    match count {
        Ok(count) => {
            *off = reader.x;
            Ok(Some(count))
        }
        Err(_) => Ok(None),
    }
}
