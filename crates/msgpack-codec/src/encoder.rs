//! `MsgPackEncoder`, the MessagePack packer.
//!
//! Every `pack_*` operation writes one complete record (tag plus payload)
//! through an [`Output`]: the growable [`Writer`] or a [`SinkWriter`] in front
//! of any `std::io::Write`. Integers always take the shortest encoding.

use std::io::Write;

use msgpack_buffers::{Output, SinkWriter, Writer};

use crate::constants::*;
use crate::error::{EncodeError, LengthKind};
use crate::ext::{ExtType, Timestamp};
use crate::options::EncoderOptions;
use crate::value::MsgPackValue;

pub struct MsgPackEncoder<O: Output = Writer> {
    pub out: O,
    pub options: EncoderOptions,
}

impl Default for MsgPackEncoder<Writer> {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgPackEncoder<Writer> {
    pub fn new() -> Self {
        Self::with_options(EncoderOptions::default())
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        let alloc_size = options.buffer_size.unwrap_or(Writer::DEFAULT_ALLOC_SIZE);
        Self {
            out: Writer::with_alloc_size(alloc_size),
            options,
        }
    }

    /// Encodes `value` and returns its bytes.
    ///
    /// With `autoreset` off the encoder keeps accumulating and the returned
    /// bytes cover everything packed since the last [`reset`](Self::reset).
    pub fn encode(&mut self, value: &MsgPackValue) -> Result<Vec<u8>, EncodeError> {
        if let Err(err) = self.write_any(value) {
            if self.options.autoreset {
                self.out.reset();
            }
            return Err(err);
        }
        if self.options.autoreset {
            Ok(self.out.take())
        } else {
            Ok(self.out.as_slice().to_vec())
        }
    }

    /// Bytes packed since the last reset.
    pub fn bytes(&self) -> &[u8] {
        self.out.as_slice()
    }

    /// Discards everything packed since the last reset.
    pub fn reset(&mut self) {
        self.out.reset();
    }

    /// Returns the packed bytes and starts over.
    pub fn take(&mut self) -> Vec<u8> {
        self.out.take()
    }
}

impl<W: Write> MsgPackEncoder<SinkWriter<W>> {
    /// Creates an encoder that flushes into `sink`.
    pub fn to_writer(sink: W) -> Self {
        Self::to_writer_with_options(sink, EncoderOptions::default())
    }

    pub fn to_writer_with_options(sink: W, options: EncoderOptions) -> Self {
        let capacity = options
            .buffer_size
            .unwrap_or(SinkWriter::<W>::DEFAULT_CAPACITY);
        Self {
            out: SinkWriter::with_capacity(sink, capacity),
            options,
        }
    }

    /// Flushes pending bytes and returns the sink.
    pub fn into_inner(self) -> Result<W, EncodeError> {
        Ok(self.out.into_inner()?)
    }
}

impl<O: Output> MsgPackEncoder<O> {
    pub fn from_output(out: O, options: EncoderOptions) -> Self {
        Self { out, options }
    }

    /// Hands buffered bytes to the sink, if the output has one.
    pub fn flush(&mut self) -> Result<(), EncodeError> {
        Ok(self.out.flush()?)
    }

    // ----------------------------------------------------------------
    // Scalars

    pub fn pack_nil(&mut self) -> Result<(), EncodeError> {
        Ok(self.out.u8(NIL)?)
    }

    pub fn pack_bool(&mut self, b: bool) -> Result<(), EncodeError> {
        Ok(self.out.u8(if b { TRUE } else { FALSE })?)
    }

    pub fn pack_u8(&mut self, v: u8) -> Result<(), EncodeError> {
        self.pack_uint(u64::from(v))
    }

    pub fn pack_u16(&mut self, v: u16) -> Result<(), EncodeError> {
        self.pack_uint(u64::from(v))
    }

    pub fn pack_u32(&mut self, v: u32) -> Result<(), EncodeError> {
        self.pack_uint(u64::from(v))
    }

    pub fn pack_u64(&mut self, v: u64) -> Result<(), EncodeError> {
        self.pack_uint(v)
    }

    pub fn pack_i8(&mut self, v: i8) -> Result<(), EncodeError> {
        self.pack_int(i64::from(v))
    }

    pub fn pack_i16(&mut self, v: i16) -> Result<(), EncodeError> {
        self.pack_int(i64::from(v))
    }

    pub fn pack_i32(&mut self, v: i32) -> Result<(), EncodeError> {
        self.pack_int(i64::from(v))
    }

    pub fn pack_i64(&mut self, v: i64) -> Result<(), EncodeError> {
        self.pack_int(v)
    }

    /// Packs an unsigned integer with the shortest unsigned encoding.
    pub fn pack_uint(&mut self, v: u64) -> Result<(), EncodeError> {
        let out = &mut self.out;
        if v <= u64::from(POSITIVE_FIXINT_MAX) {
            out.u8(v as u8)?;
        } else if v <= 0xff {
            out.u8u8(UINT8, v as u8)?;
        } else if v <= 0xffff {
            out.u8u16(UINT16, v as u16)?;
        } else if v <= 0xffff_ffff {
            out.u8u32(UINT32, v as u32)?;
        } else {
            out.u8u64(UINT64, v)?;
        }
        Ok(())
    }

    /// Packs a signed integer. Non-negative values take the unsigned path,
    /// so 200 is written as `cc c8`.
    pub fn pack_int(&mut self, v: i64) -> Result<(), EncodeError> {
        if v >= 0 {
            return self.pack_uint(v as u64);
        }
        let out = &mut self.out;
        if v >= -32 {
            out.u8(v as u8)?;
        } else if v >= i64::from(i8::MIN) {
            out.u8u8(INT8, v as u8)?;
        } else if v >= i64::from(i16::MIN) {
            out.u8u16(INT16, v as u16)?;
        } else if v >= i64::from(i32::MIN) {
            out.u8u32(INT32, v as u32)?;
        } else {
            out.u8u64(INT64, v as u64)?;
        }
        Ok(())
    }

    /// Packs any integer in `[i64::MIN, u64::MAX]`.
    pub fn pack_i128(&mut self, v: i128) -> Result<(), EncodeError> {
        if let Ok(u) = u64::try_from(v) {
            self.pack_uint(u)
        } else if let Ok(i) = i64::try_from(v) {
            self.pack_int(i)
        } else {
            Err(EncodeError::IntegerOverflow(v))
        }
    }

    pub fn pack_f32(&mut self, v: f32) -> Result<(), EncodeError> {
        Ok(self.out.u8f32(FLOAT32, v)?)
    }

    pub fn pack_f64(&mut self, v: f64) -> Result<(), EncodeError> {
        Ok(self.out.u8f64(FLOAT64, v)?)
    }

    // ----------------------------------------------------------------
    // Strings and binary

    pub fn pack_str(&mut self, s: &str) -> Result<(), EncodeError> {
        self.pack_str_bytes(s.as_bytes())
    }

    /// Packs already-encoded UTF-8 bytes as a str.
    pub fn pack_str_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.pack_str_header(bytes.len())?;
        Ok(self.out.buf(bytes)?)
    }

    /// Writes only the header of a str; the caller writes `len` payload
    /// bytes next.
    pub fn pack_str_header(&mut self, len: usize) -> Result<(), EncodeError> {
        check_len(LengthKind::Str, len, self.options.max_str_len)?;
        self.write_str_header(len)
    }

    fn write_str_header(&mut self, len: usize) -> Result<(), EncodeError> {
        let out = &mut self.out;
        if len < 32 {
            out.u8(FIXSTR | len as u8)?;
        } else if len <= 0xff && self.options.use_bin_type {
            out.u8u8(STR8, len as u8)?;
        } else if len <= 0xffff {
            out.u8u16(STR16, len as u16)?;
        } else {
            out.u8u32(STR32, len as u32)?;
        }
        Ok(())
    }

    pub fn pack_bin(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.pack_bin_header(bytes.len())?;
        Ok(self.out.buf(bytes)?)
    }

    /// Writes only the header of a bin. Without `use_bin_type` this is a
    /// raw string header.
    pub fn pack_bin_header(&mut self, len: usize) -> Result<(), EncodeError> {
        check_len(LengthKind::Bin, len, self.options.max_bin_len)?;
        if !self.options.use_bin_type {
            return self.write_str_header(len);
        }
        let out = &mut self.out;
        if len <= 0xff {
            out.u8u8(BIN8, len as u8)?;
        } else if len <= 0xffff {
            out.u8u16(BIN16, len as u16)?;
        } else {
            out.u8u32(BIN32, len as u32)?;
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Containers

    /// Writes an array header; the caller packs `len` items next.
    pub fn pack_array_header(&mut self, len: usize) -> Result<(), EncodeError> {
        check_len(LengthKind::Array, len, MAX_WIRE_LEN)?;
        let out = &mut self.out;
        if len <= 0x0f {
            out.u8(FIXARRAY | len as u8)?;
        } else if len <= 0xffff {
            out.u8u16(ARRAY16, len as u16)?;
        } else {
            out.u8u32(ARRAY32, len as u32)?;
        }
        Ok(())
    }

    /// Writes a map header; the caller packs `len` key/value pairs next.
    pub fn pack_map_header(&mut self, len: usize) -> Result<(), EncodeError> {
        check_len(LengthKind::Map, len, MAX_WIRE_LEN)?;
        let out = &mut self.out;
        if len <= 0x0f {
            out.u8(FIXMAP | len as u8)?;
        } else if len <= 0xffff {
            out.u8u16(MAP16, len as u16)?;
        } else {
            out.u8u32(MAP32, len as u32)?;
        }
        Ok(())
    }

    pub fn pack_map_pairs(
        &mut self,
        pairs: &[(MsgPackValue, MsgPackValue)],
    ) -> Result<(), EncodeError> {
        let depth = self.options.max_depth;
        self.write_map(pairs, depth)
    }

    // ----------------------------------------------------------------
    // Extensions

    pub fn pack_ext(&mut self, code: i8, data: &[u8]) -> Result<(), EncodeError> {
        self.pack_ext_header(code, data.len())?;
        Ok(self.out.buf(data)?)
    }

    pub fn pack_ext_type(&mut self, ext: &ExtType) -> Result<(), EncodeError> {
        self.pack_ext(ext.code, &ext.data)
    }

    /// Writes an ext header. Payloads of 1, 2, 4, 8 and 16 bytes use the
    /// fixext tags.
    pub fn pack_ext_header(&mut self, code: i8, len: usize) -> Result<(), EncodeError> {
        check_len(LengthKind::Ext, len, MAX_WIRE_LEN)?;
        let code = code as u8;
        let out = &mut self.out;
        match len {
            1 => out.u8u8(FIXEXT1, code)?,
            2 => out.u8u8(FIXEXT2, code)?,
            4 => out.u8u8(FIXEXT4, code)?,
            8 => out.u8u8(FIXEXT8, code)?,
            16 => out.u8u8(FIXEXT16, code)?,
            _ if len <= 0xff => out.write(&[EXT8, len as u8, code])?,
            _ if len <= 0xffff => {
                let [b0, b1] = (len as u16).to_be_bytes();
                out.write(&[EXT16, b0, b1, code])?
            }
            _ => {
                let [b0, b1, b2, b3] = (len as u32).to_be_bytes();
                out.write(&[EXT32, b0, b1, b2, b3, code])?
            }
        }
        Ok(())
    }

    pub fn pack_timestamp(&mut self, ts: &Timestamp) -> Result<(), EncodeError> {
        self.pack_ext(Timestamp::EXT_TYPE, &ts.to_bytes())
    }

    // ----------------------------------------------------------------
    // Value trees

    /// Packs a whole value tree, refusing nesting deeper than
    /// `options.max_depth`.
    pub fn write_any(&mut self, value: &MsgPackValue) -> Result<(), EncodeError> {
        let depth = self.options.max_depth;
        self.write_value(value, depth)
    }

    fn write_value(&mut self, value: &MsgPackValue, depth: usize) -> Result<(), EncodeError> {
        match value {
            MsgPackValue::Nil => self.pack_nil(),
            MsgPackValue::Bool(b) => self.pack_bool(*b),
            MsgPackValue::Integer(i) => self.pack_int(*i),
            MsgPackValue::UInteger(u) => self.pack_uint(*u),
            MsgPackValue::Float32(f) => self.pack_f32(*f),
            MsgPackValue::Float64(f) if self.options.use_single_float => self.pack_f32(*f as f32),
            MsgPackValue::Float64(f) => self.pack_f64(*f),
            MsgPackValue::Str(s) => self.pack_str(s),
            MsgPackValue::Bin(b) => self.pack_bin(b),
            MsgPackValue::Array(items) => {
                let depth = self.descend(depth)?;
                self.pack_array_header(items.len())?;
                for item in items {
                    self.write_value(item, depth)?;
                }
                Ok(())
            }
            MsgPackValue::Map(pairs) => self.write_map(pairs, depth),
            MsgPackValue::Ext(ext) => self.pack_ext_type(ext),
            MsgPackValue::Timestamp(ts) => self.pack_timestamp(ts),
        }
    }

    fn write_map(
        &mut self,
        pairs: &[(MsgPackValue, MsgPackValue)],
        depth: usize,
    ) -> Result<(), EncodeError> {
        let depth = self.descend(depth)?;
        self.pack_map_header(pairs.len())?;
        for (key, value) in pairs {
            self.write_value(key, depth)?;
            self.write_value(value, depth)?;
        }
        Ok(())
    }

    fn descend(&self, depth: usize) -> Result<usize, EncodeError> {
        depth
            .checked_sub(1)
            .ok_or(EncodeError::DepthExceeded(self.options.max_depth))
    }
}

fn check_len(kind: LengthKind, len: usize, max: usize) -> Result<(), EncodeError> {
    let max = max.min(MAX_WIRE_LEN);
    if len > max {
        return Err(EncodeError::LengthExceeded { kind, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(f: impl FnOnce(&mut MsgPackEncoder) -> Result<(), EncodeError>) -> Vec<u8> {
        let mut encoder = MsgPackEncoder::new();
        f(&mut encoder).unwrap();
        encoder.take()
    }

    #[test]
    fn test_minimal_integers() {
        assert_eq!(packed(|e| e.pack_int(0)), [0x00]);
        assert_eq!(packed(|e| e.pack_int(127)), [0x7f]);
        assert_eq!(packed(|e| e.pack_int(128)), [0xcc, 0x80]);
        assert_eq!(packed(|e| e.pack_int(256)), [0xcd, 0x01, 0x00]);
        assert_eq!(packed(|e| e.pack_int(-1)), [0xff]);
        assert_eq!(packed(|e| e.pack_int(-32)), [0xe0]);
        assert_eq!(packed(|e| e.pack_int(-33)), [0xd0, 0xdf]);
        assert_eq!(packed(|e| e.pack_int(-129)), [0xd1, 0xff, 0x7f]);
        assert_eq!(
            packed(|e| e.pack_int(i64::from(i32::MIN) - 1)),
            [0xd3, 0xff, 0xff, 0xff, 0xff, 0x7f, 0xff, 0xff, 0xff]
        );
        assert_eq!(
            packed(|e| e.pack_u64(u64::MAX)),
            [0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_i128_range() {
        assert_eq!(packed(|e| e.pack_i128(-1)), [0xff]);
        assert_eq!(packed(|e| e.pack_i128(i128::from(u64::MAX)))[0], 0xcf);
        let mut encoder = MsgPackEncoder::new();
        assert!(matches!(
            encoder.pack_i128(i128::from(u64::MAX) + 1),
            Err(EncodeError::IntegerOverflow(_))
        ));
        assert!(matches!(
            encoder.pack_i128(i128::from(i64::MIN) - 1),
            Err(EncodeError::IntegerOverflow(_))
        ));
        assert!(encoder.bytes().is_empty());
    }

    #[test]
    fn test_str_tiers() {
        assert_eq!(packed(|e| e.pack_str("hello")), b"\xa5hello");
        let s = "x".repeat(32);
        assert_eq!(packed(|e| e.pack_str(&s))[..2], [0xd9, 32]);
        let s = "x".repeat(256);
        assert_eq!(packed(|e| e.pack_str(&s))[..3], [0xda, 0x01, 0x00]);
        let s = "x".repeat(65536);
        assert_eq!(packed(|e| e.pack_str(&s))[..5], [0xdb, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_legacy_raw_mode() {
        let mut encoder = MsgPackEncoder::with_options(EncoderOptions {
            use_bin_type: false,
            ..EncoderOptions::default()
        });
        encoder.pack_str(&"x".repeat(32)).unwrap();
        assert_eq!(encoder.take()[..3], [0xda, 0x00, 0x20]);
        encoder.pack_bin(&[1, 2]).unwrap();
        assert_eq!(encoder.take(), [0xa2, 1, 2]);
    }

    #[test]
    fn test_bin_tiers() {
        assert_eq!(packed(|e| e.pack_bin(&[])), [0xc4, 0x00]);
        assert_eq!(packed(|e| e.pack_bin(&[0; 256]))[..3], [0xc5, 0x01, 0x00]);
    }

    #[test]
    fn test_ext_tags() {
        assert_eq!(packed(|e| e.pack_ext(5, &[1])), [0xd4, 5, 1]);
        assert_eq!(packed(|e| e.pack_ext(5, &[0; 16]))[..2], [0xd8, 5]);
        assert_eq!(packed(|e| e.pack_ext(-2, &[0; 3]))[..3], [0xc7, 3, 0xfe]);
        assert_eq!(packed(|e| e.pack_ext(1, &[]))[..], [0xc7, 0, 1]);
        assert_eq!(
            packed(|e| e.pack_ext(1, &[0; 256]))[..4],
            [0xc8, 0x01, 0x00, 1]
        );
    }

    #[test]
    fn test_timestamp_forms() {
        let ts = Timestamp::new(0, 0).unwrap();
        assert_eq!(packed(|e| e.pack_timestamp(&ts)), [0xd6, 0xff, 0, 0, 0, 0]);
        let ts = Timestamp::new(1 << 34, 0).unwrap();
        let bytes = packed(|e| e.pack_timestamp(&ts));
        assert_eq!(bytes[..3], [0xc7, 12, 0xff]);
        assert_eq!(bytes.len(), 15);
    }

    #[test]
    fn test_length_limit_writes_nothing() {
        let mut encoder = MsgPackEncoder::with_options(EncoderOptions {
            max_str_len: 4,
            ..EncoderOptions::default()
        });
        encoder.pack_nil().unwrap();
        let err = encoder.pack_str("hello").unwrap_err();
        assert!(matches!(
            err,
            EncodeError::LengthExceeded {
                kind: LengthKind::Str,
                len: 5,
                max: 4
            }
        ));
        assert_eq!(encoder.bytes(), [0xc0]);
    }

    #[test]
    fn test_depth_limit() {
        let mut value = MsgPackValue::Nil;
        for _ in 0..3 {
            value = MsgPackValue::Array(vec![value]);
        }
        let mut encoder = MsgPackEncoder::with_options(EncoderOptions {
            max_depth: 2,
            ..EncoderOptions::default()
        });
        assert!(matches!(
            encoder.encode(&value),
            Err(EncodeError::DepthExceeded(2))
        ));
        assert!(encoder.bytes().is_empty());

        encoder.options.max_depth = 3;
        assert_eq!(encoder.encode(&value).unwrap(), [0x91, 0x91, 0x91, 0xc0]);
    }

    #[test]
    fn test_single_float() {
        let mut encoder = MsgPackEncoder::with_options(EncoderOptions {
            use_single_float: true,
            ..EncoderOptions::default()
        });
        let bytes = encoder.encode(&MsgPackValue::Float64(1.5)).unwrap();
        assert_eq!(bytes, [0xca, 0x3f, 0xc0, 0x00, 0x00]);
    }

    #[test]
    fn test_autoreset_off_accumulates() {
        let mut encoder = MsgPackEncoder::with_options(EncoderOptions {
            autoreset: false,
            ..EncoderOptions::default()
        });
        encoder.encode(&MsgPackValue::Integer(1)).unwrap();
        let bytes = encoder.encode(&MsgPackValue::Integer(2)).unwrap();
        assert_eq!(bytes, [0x01, 0x02]);
        encoder.reset();
        assert!(encoder.bytes().is_empty());
    }

    #[test]
    fn test_sink_encoder() {
        let mut encoder = MsgPackEncoder::to_writer_with_options(
            Vec::new(),
            EncoderOptions {
                buffer_size: Some(4),
                ..EncoderOptions::default()
            },
        );
        encoder.pack_array_header(2).unwrap();
        encoder.pack_str("abcdef").unwrap();
        encoder.pack_bool(true).unwrap();
        assert_eq!(encoder.into_inner().unwrap(), b"\x92\xa6abcdef\xc3");
    }
}
