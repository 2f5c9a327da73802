//! The resumable decoder state machine.

use msgpack_buffers::Reader;
use tracing::debug;

use crate::constants::*;
use crate::error::{LengthKind, MsgPackError};
use crate::options::{DecoderOptions, Limits};

use super::builder::Builder;

/// A fixed-width field the decoder is waiting on after a tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Float32,
    Float64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    StrLen8,
    StrLen16,
    StrLen32,
    BinLen8,
    BinLen16,
    BinLen32,
    ExtLen8,
    ExtLen16,
    ExtLen32,
    ArrayLen16,
    ArrayLen32,
    MapLen16,
    MapLen32,
    StrBody,
    BinBody,
    /// Typecode byte followed by the payload.
    ExtBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Trail(Field),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Array,
    Map,
}

/// An open container on the explicit stack.
struct Frame<V> {
    kind: FrameKind,
    container: V,
    size: usize,
    count: usize,
    /// A decoded map key waiting for its value.
    key: Option<V>,
}

/// Outcome of processing one tag or field.
enum Step<V> {
    Value(V),
    Await,
}

/// Decoding state for one root value at a time.
///
/// [`Context::execute`] consumes as much of `data[*off..]` as it can. When the
/// input ends mid-value it returns `Ok(None)` and remembers where it was;
/// the next call continues from the new offset with the bytes that follow.
/// Bytes before the returned offset are never looked at again, and a field
/// that is only partly available is left unconsumed.
///
/// # Example
///
/// ```
/// use msgpack_codec::decoder::{Context, ValueBuilder};
/// use msgpack_codec::MsgPackValue;
///
/// let mut ctx = Context::default();
/// let mut builder = ValueBuilder::default();
/// let data = [0x92, 0x01, 0xcd, 0x01, 0x00];
///
/// let mut off = 0;
/// assert_eq!(ctx.execute(&mut builder, &data[..3], &mut off).unwrap(), None);
/// assert_eq!(off, 3);
/// let value = ctx.execute(&mut builder, &data, &mut off).unwrap();
/// assert_eq!(
///     value,
///     Some(MsgPackValue::Array(vec![
///         MsgPackValue::Integer(1),
///         MsgPackValue::Integer(256),
///     ]))
/// );
/// ```
pub struct Context<B: Builder> {
    cs: State,
    trail: usize,
    stack: Vec<Frame<B::Value>>,
    limits: Limits,
}

impl<B: Builder> Default for Context<B> {
    fn default() -> Self {
        Self::with_limits(Limits::default())
    }
}

impl<B: Builder> Context<B> {
    pub fn new(options: &DecoderOptions) -> Self {
        Self::with_limits(options.limits())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            cs: State::Header,
            trail: 0,
            stack: Vec::new(),
            limits,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Drops any partially decoded value.
    pub fn reset(&mut self) {
        self.cs = State::Header;
        self.trail = 0;
        self.stack.clear();
    }

    /// `true` when no value is in progress.
    pub fn is_idle(&self) -> bool {
        self.cs == State::Header && self.stack.is_empty()
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Decodes from `data[*off..]`.
    ///
    /// Returns `Ok(Some(root))` once a root value completes, with `*off`
    /// just past it; the context is then ready for the next root.
    /// Returns `Ok(None)` when more input is needed. On error the context
    /// is reset and `*off` points at the offending tag or field.
    pub fn execute(
        &mut self,
        builder: &mut B,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<B::Value>, MsgPackError> {
        let result = self.run(builder, data, off);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn run(
        &mut self,
        builder: &mut B,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<B::Value>, MsgPackError> {
        loop {
            let value = match self.cs {
                State::Header => {
                    let Some(&byte) = data.get(*off) else {
                        return Ok(None);
                    };
                    let step = self.header(builder, byte)?;
                    *off += 1;
                    match step {
                        Step::Value(value) => value,
                        Step::Await => continue,
                    }
                }
                State::Trail(field) => {
                    let start = *off;
                    if data.len().saturating_sub(start) < self.trail {
                        return Ok(None);
                    }
                    let bytes = &data[start..start + self.trail];
                    self.cs = State::Header;
                    self.trail = 0;
                    let step = self.field(builder, field, bytes)?;
                    *off = start + bytes.len();
                    match step {
                        Step::Value(value) => value,
                        Step::Await => continue,
                    }
                }
            };
            if let Some(root) = self.complete(builder, value)? {
                return Ok(Some(root));
            }
        }
    }

    /// Dispatches on a tag byte.
    fn header(&mut self, builder: &mut B, byte: u8) -> Result<Step<B::Value>, MsgPackError> {
        let value = match byte {
            0x00..=POSITIVE_FIXINT_MAX => builder.uint(u64::from(byte))?,
            NEGATIVE_FIXINT..=0xff => builder.int(i64::from(byte as i8))?,
            FIXMAP..=0x8f => return self.begin_map(builder, usize::from(byte & 0x0f)),
            FIXARRAY..=0x9f => return self.begin_array(builder, usize::from(byte & 0x0f)),
            FIXSTR..=0xbf => return self.begin_str(builder, usize::from(byte & 0x1f)),
            NIL => builder.nil()?,
            FALSE => builder.boolean(false)?,
            TRUE => builder.boolean(true)?,
            BIN8 => return Ok(self.wait(Field::BinLen8, 1)),
            BIN16 => return Ok(self.wait(Field::BinLen16, 2)),
            BIN32 => return Ok(self.wait(Field::BinLen32, 4)),
            EXT8 => return Ok(self.wait(Field::ExtLen8, 1)),
            EXT16 => return Ok(self.wait(Field::ExtLen16, 2)),
            EXT32 => return Ok(self.wait(Field::ExtLen32, 4)),
            FLOAT32 => return Ok(self.wait(Field::Float32, 4)),
            FLOAT64 => return Ok(self.wait(Field::Float64, 8)),
            UINT8 => return Ok(self.wait(Field::Uint8, 1)),
            UINT16 => return Ok(self.wait(Field::Uint16, 2)),
            UINT32 => return Ok(self.wait(Field::Uint32, 4)),
            UINT64 => return Ok(self.wait(Field::Uint64, 8)),
            INT8 => return Ok(self.wait(Field::Int8, 1)),
            INT16 => return Ok(self.wait(Field::Int16, 2)),
            INT32 => return Ok(self.wait(Field::Int32, 4)),
            INT64 => return Ok(self.wait(Field::Int64, 8)),
            FIXEXT1 => return self.begin_ext(1),
            FIXEXT2 => return self.begin_ext(2),
            FIXEXT4 => return self.begin_ext(4),
            FIXEXT8 => return self.begin_ext(8),
            FIXEXT16 => return self.begin_ext(16),
            STR8 => return Ok(self.wait(Field::StrLen8, 1)),
            STR16 => return Ok(self.wait(Field::StrLen16, 2)),
            STR32 => return Ok(self.wait(Field::StrLen32, 4)),
            ARRAY16 => return Ok(self.wait(Field::ArrayLen16, 2)),
            ARRAY32 => return Ok(self.wait(Field::ArrayLen32, 4)),
            MAP16 => return Ok(self.wait(Field::MapLen16, 2)),
            MAP32 => return Ok(self.wait(Field::MapLen32, 4)),
            NEVER_USED => {
                debug!(byte, "rejecting reserved type marker");
                return Err(MsgPackError::InvalidByte(byte));
            }
        };
        Ok(Step::Value(value))
    }

    /// Handles a complete fixed-width field.
    fn field(
        &mut self,
        builder: &mut B,
        field: Field,
        bytes: &[u8],
    ) -> Result<Step<B::Value>, MsgPackError> {
        let mut reader = Reader::new(bytes);
        let value = match field {
            Field::Float32 => builder.float32(reader.f32()?)?,
            Field::Float64 => builder.float64(reader.f64()?)?,
            Field::Uint8 => builder.uint(u64::from(reader.u8()?))?,
            Field::Uint16 => builder.uint(u64::from(reader.u16()?))?,
            Field::Uint32 => builder.uint(u64::from(reader.u32()?))?,
            Field::Uint64 => builder.uint(reader.u64()?)?,
            Field::Int8 => builder.int(i64::from(reader.i8()?))?,
            Field::Int16 => builder.int(i64::from(reader.i16()?))?,
            Field::Int32 => builder.int(i64::from(reader.i32()?))?,
            Field::Int64 => builder.int(reader.i64()?)?,
            Field::StrLen8 => return self.begin_str(builder, usize::from(reader.u8()?)),
            Field::StrLen16 => return self.begin_str(builder, usize::from(reader.u16()?)),
            Field::StrLen32 => return self.begin_str(builder, reader.u32()? as usize),
            Field::BinLen8 => return self.begin_bin(builder, usize::from(reader.u8()?)),
            Field::BinLen16 => return self.begin_bin(builder, usize::from(reader.u16()?)),
            Field::BinLen32 => return self.begin_bin(builder, reader.u32()? as usize),
            Field::ExtLen8 => return self.begin_ext(usize::from(reader.u8()?)),
            Field::ExtLen16 => return self.begin_ext(usize::from(reader.u16()?)),
            Field::ExtLen32 => return self.begin_ext(reader.u32()? as usize),
            Field::ArrayLen16 => return self.begin_array(builder, usize::from(reader.u16()?)),
            Field::ArrayLen32 => return self.begin_array(builder, reader.u32()? as usize),
            Field::MapLen16 => return self.begin_map(builder, usize::from(reader.u16()?)),
            Field::MapLen32 => return self.begin_map(builder, reader.u32()? as usize),
            Field::StrBody => builder.str(reader.buf(bytes.len())?)?,
            Field::BinBody => builder.bin(reader.buf(bytes.len())?)?,
            Field::ExtBody => {
                let code = reader.i8()?;
                builder.ext(code, reader.buf(bytes.len() - 1)?)?
            }
        };
        Ok(Step::Value(value))
    }

    fn wait(&mut self, field: Field, trail: usize) -> Step<B::Value> {
        self.cs = State::Trail(field);
        self.trail = trail;
        Step::Await
    }

    fn check_len(&self, kind: LengthKind, len: usize, max: usize) -> Result<(), MsgPackError> {
        if len > max {
            debug!(%kind, len, max, "rejecting oversized length");
            return Err(MsgPackError::LengthExceeded { kind, len, max });
        }
        Ok(())
    }

    fn begin_str(&mut self, builder: &mut B, len: usize) -> Result<Step<B::Value>, MsgPackError> {
        self.check_len(LengthKind::Str, len, self.limits.str_len)?;
        if len == 0 {
            return Ok(Step::Value(builder.str(&[])?));
        }
        Ok(self.wait(Field::StrBody, len))
    }

    fn begin_bin(&mut self, builder: &mut B, len: usize) -> Result<Step<B::Value>, MsgPackError> {
        self.check_len(LengthKind::Bin, len, self.limits.bin_len)?;
        if len == 0 {
            return Ok(Step::Value(builder.bin(&[])?));
        }
        Ok(self.wait(Field::BinBody, len))
    }

    fn begin_ext(&mut self, len: usize) -> Result<Step<B::Value>, MsgPackError> {
        self.check_len(LengthKind::Ext, len, self.limits.ext_len)?;
        let trail = len.checked_add(1).ok_or(MsgPackError::LengthExceeded {
            kind: LengthKind::Ext,
            len,
            max: self.limits.ext_len,
        })?;
        Ok(self.wait(Field::ExtBody, trail))
    }

    fn push(&mut self, kind: FrameKind, container: B::Value, size: usize) -> Result<(), MsgPackError> {
        self.stack
            .try_reserve(1)
            .map_err(|_| MsgPackError::OutOfMemory)?;
        self.stack.push(Frame {
            kind,
            container,
            size,
            count: 0,
            key: None,
        });
        Ok(())
    }

    fn check_depth(&self) -> Result<(), MsgPackError> {
        if self.stack.len() >= self.limits.depth {
            debug!(depth = self.stack.len(), "rejecting nested container");
            return Err(MsgPackError::StackDepthExceeded(self.limits.depth));
        }
        Ok(())
    }

    fn begin_array(&mut self, builder: &mut B, len: usize) -> Result<Step<B::Value>, MsgPackError> {
        self.check_depth()?;
        self.check_len(LengthKind::Array, len, self.limits.array_len)?;
        let array = builder.array_begin(len)?;
        if len == 0 {
            return Ok(Step::Value(builder.array_end(array)?));
        }
        self.push(FrameKind::Array, array, len)?;
        Ok(Step::Await)
    }

    fn begin_map(&mut self, builder: &mut B, len: usize) -> Result<Step<B::Value>, MsgPackError> {
        self.check_depth()?;
        self.check_len(LengthKind::Map, len, self.limits.map_len)?;
        let map = builder.map_begin(len)?;
        if len == 0 {
            return Ok(Step::Value(builder.map_end(map)?));
        }
        self.push(FrameKind::Map, map, len)?;
        Ok(Step::Await)
    }

    /// Delivers a finished value to the innermost open container, closing
    /// every container it completes. Returns the root once the stack is
    /// empty.
    fn complete(
        &mut self,
        builder: &mut B,
        mut value: B::Value,
    ) -> Result<Option<B::Value>, MsgPackError> {
        loop {
            let Some(mut frame) = self.stack.pop() else {
                return Ok(Some(value));
            };
            match frame.kind {
                FrameKind::Array => {
                    builder.array_item(&mut frame.container, frame.count, value)?;
                }
                FrameKind::Map => match frame.key.take() {
                    None => {
                        frame.key = Some(value);
                        self.stack.push(frame);
                        return Ok(None);
                    }
                    Some(key) => {
                        builder.map_item(&mut frame.container, frame.count, key, value)?;
                    }
                },
            }
            frame.count += 1;
            if frame.count < frame.size {
                self.stack.push(frame);
                return Ok(None);
            }
            value = match frame.kind {
                FrameKind::Array => builder.array_end(frame.container)?,
                FrameKind::Map => builder.map_end(frame.container)?,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{SkipBuilder, ValueBuilder};
    use crate::value::MsgPackValue;

    fn decode(data: &[u8]) -> Result<Option<MsgPackValue>, MsgPackError> {
        let mut ctx = Context::default();
        let mut off = 0;
        ctx.execute(&mut ValueBuilder::default(), data, &mut off)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(decode(&[0x05]).unwrap(), Some(MsgPackValue::Integer(5)));
        assert_eq!(decode(&[0xff]).unwrap(), Some(MsgPackValue::Integer(-1)));
        assert_eq!(decode(&[0xc0]).unwrap(), Some(MsgPackValue::Nil));
        assert_eq!(
            decode(&[0xd0, 0x80]).unwrap(),
            Some(MsgPackValue::Integer(-128))
        );
        assert_eq!(
            decode(&[0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Some(MsgPackValue::UInteger(u64::MAX))
        );
        assert_eq!(
            decode(&[0xca, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            Some(MsgPackValue::Float32(1.5))
        );
    }

    #[test]
    fn test_never_used_byte() {
        assert_eq!(decode(&[0xc1]), Err(MsgPackError::InvalidByte(0xc1)));
        assert_eq!(decode(&[0x91, 0xc1]), Err(MsgPackError::InvalidByte(0xc1)));
    }

    #[test]
    fn test_empty_containers_need_no_trail() {
        assert_eq!(decode(&[0x90]).unwrap(), Some(MsgPackValue::Array(vec![])));
        assert_eq!(decode(&[0x80]).unwrap(), Some(MsgPackValue::Map(vec![])));
        assert_eq!(
            decode(&[0xa0]).unwrap(),
            Some(MsgPackValue::Str(String::new()))
        );
        assert_eq!(decode(&[0xc4, 0x00]).unwrap(), Some(MsgPackValue::Bin(vec![])));
        assert_eq!(
            decode(&[0xdc, 0x00, 0x00]).unwrap(),
            Some(MsgPackValue::Array(vec![]))
        );
    }

    #[test]
    fn test_incomplete_field_is_not_consumed() {
        let mut ctx = Context::default();
        let mut builder = ValueBuilder::default();
        let data = [0xcd, 0x01, 0x00];
        let mut off = 0;
        assert_eq!(ctx.execute(&mut builder, &data[..2], &mut off).unwrap(), None);
        assert_eq!(off, 1);
        assert_eq!(ctx.execute(&mut builder, &data[..2], &mut off).unwrap(), None);
        assert_eq!(off, 1);
        assert_eq!(
            ctx.execute(&mut builder, &data, &mut off).unwrap(),
            Some(MsgPackValue::Integer(256))
        );
        assert_eq!(off, 3);
        assert!(ctx.is_idle());
    }

    #[test]
    fn test_consecutive_roots() {
        let mut ctx = Context::default();
        let mut builder = ValueBuilder::default();
        let data = [0x01, 0x91, 0x02, 0xc3];
        let mut off = 0;
        let mut values = Vec::new();
        while let Some(value) = ctx.execute(&mut builder, &data, &mut off).unwrap() {
            values.push(value);
        }
        assert_eq!(
            values,
            vec![
                MsgPackValue::Integer(1),
                MsgPackValue::Array(vec![MsgPackValue::Integer(2)]),
                MsgPackValue::Bool(true),
            ]
        );
        assert_eq!(off, data.len());
    }

    #[test]
    fn test_nested_map() {
        // {"a": [1, {}], "b": nil}
        let data = [0x82, 0xa1, b'a', 0x92, 0x01, 0x80, 0xa1, b'b', 0xc0];
        assert_eq!(
            decode(&data).unwrap(),
            Some(MsgPackValue::Map(vec![
                (
                    MsgPackValue::from("a"),
                    MsgPackValue::Array(vec![MsgPackValue::Integer(1), MsgPackValue::Map(vec![])])
                ),
                (MsgPackValue::from("b"), MsgPackValue::Nil),
            ]))
        );
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            depth: 2,
            ..Limits::default()
        };
        let mut ctx = Context::<ValueBuilder>::with_limits(limits);
        let mut off = 0;
        let result = ctx.execute(&mut ValueBuilder::default(), &[0x91, 0x91, 0x91, 0x01], &mut off);
        assert_eq!(result, Err(MsgPackError::StackDepthExceeded(2)));
        assert_eq!(off, 2);
        assert!(ctx.is_idle());

        let mut off = 0;
        let result = ctx.execute(&mut ValueBuilder::default(), &[0x91, 0x91, 0x01], &mut off);
        assert!(result.unwrap().is_some());
    }

    #[test]
    fn test_length_limit_applies_in_skip_mode() {
        let limits = Limits {
            str_len: 3,
            ..Limits::default()
        };
        let mut ctx = Context::<SkipBuilder>::with_limits(limits);
        let mut off = 0;
        assert!(matches!(
            ctx.execute(&mut SkipBuilder, &[0xa4], &mut off),
            Err(MsgPackError::LengthExceeded {
                kind: LengthKind::Str,
                len: 4,
                max: 3
            })
        ));
        let mut off = 0;
        assert_eq!(
            ctx.execute(&mut SkipBuilder, &[0xa3, 1, 2, 3], &mut off),
            Ok(Some(()))
        );
        assert_eq!(off, 4);
    }

    #[test]
    fn test_ext_body() {
        assert_eq!(
            decode(&[0xd5, 0x07, 0x01, 0x02]).unwrap(),
            Some(MsgPackValue::Ext(crate::ExtType::new(7, vec![1, 2])))
        );
        assert_eq!(
            decode(&[0xc7, 0x00, 0x07]).unwrap(),
            Some(MsgPackValue::Ext(crate::ExtType::new(7, vec![])))
        );
    }

    #[test]
    fn test_builder_error_leaves_offset_at_field() {
        let mut ctx = Context::default();
        let mut off = 0;
        let result = ctx.execute(&mut ValueBuilder::default(), &[0x91, 0xa1, 0xff], &mut off);
        assert_eq!(result, Err(MsgPackError::InvalidUtf8));
        assert_eq!(off, 2);
        assert!(ctx.is_idle());
    }
}
