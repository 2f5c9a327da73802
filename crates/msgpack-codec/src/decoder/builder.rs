//! Value construction callbacks invoked by the decoder.

use crate::error::MsgPackError;
use crate::ext::{ExtType, Timestamp};
use crate::options::DecoderOptions;
use crate::value::MsgPackValue;

/// Largest element count reserved up front for a container. Longer
/// containers grow as their items arrive.
const PREALLOC_LIMIT: usize = 4096;

/// Receives decoded tokens and assembles them into values.
///
/// The decoder calls exactly one scalar method per scalar, and for
/// containers `*_begin`, then one `*_item` per entry in wire order, then
/// `*_end`. Any error aborts the decode.
pub trait Builder {
    type Value;

    fn nil(&mut self) -> Result<Self::Value, MsgPackError>;
    fn boolean(&mut self, value: bool) -> Result<Self::Value, MsgPackError>;
    fn uint(&mut self, value: u64) -> Result<Self::Value, MsgPackError>;
    fn int(&mut self, value: i64) -> Result<Self::Value, MsgPackError>;
    fn float32(&mut self, value: f32) -> Result<Self::Value, MsgPackError>;
    fn float64(&mut self, value: f64) -> Result<Self::Value, MsgPackError>;
    fn str(&mut self, bytes: &[u8]) -> Result<Self::Value, MsgPackError>;
    fn bin(&mut self, bytes: &[u8]) -> Result<Self::Value, MsgPackError>;
    fn ext(&mut self, code: i8, data: &[u8]) -> Result<Self::Value, MsgPackError>;

    fn array_begin(&mut self, len: usize) -> Result<Self::Value, MsgPackError>;
    fn array_item(
        &mut self,
        array: &mut Self::Value,
        index: usize,
        item: Self::Value,
    ) -> Result<(), MsgPackError>;
    fn array_end(&mut self, array: Self::Value) -> Result<Self::Value, MsgPackError>;

    fn map_begin(&mut self, len: usize) -> Result<Self::Value, MsgPackError>;
    fn map_item(
        &mut self,
        map: &mut Self::Value,
        index: usize,
        key: Self::Value,
        value: Self::Value,
    ) -> Result<(), MsgPackError>;
    fn map_end(&mut self, map: Self::Value) -> Result<Self::Value, MsgPackError>;
}

/// Called for every ext value the builder does not decode itself.
pub type ExtHook = Box<dyn FnMut(ExtType) -> Result<MsgPackValue, MsgPackError> + Send>;

/// Builds [`MsgPackValue`] trees.
pub struct ValueBuilder {
    raw: bool,
    strict_map_key: bool,
    timestamp: bool,
    ext_hook: Option<ExtHook>,
}

impl Default for ValueBuilder {
    fn default() -> Self {
        Self::new(&DecoderOptions::default())
    }
}

impl ValueBuilder {
    pub fn new(options: &DecoderOptions) -> Self {
        Self {
            raw: options.raw,
            strict_map_key: options.strict_map_key,
            timestamp: options.timestamp,
            ext_hook: None,
        }
    }

    /// Routes ext values (other than decoded timestamps) through `hook`.
    pub fn with_ext_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(ExtType) -> Result<MsgPackValue, MsgPackError> + Send + 'static,
    {
        self.ext_hook = Some(Box::new(hook));
        self
    }
}

fn reserved<T>(len: usize) -> Result<Vec<T>, MsgPackError> {
    let mut items = Vec::new();
    items
        .try_reserve(len.min(PREALLOC_LIMIT))
        .map_err(|_| MsgPackError::OutOfMemory)?;
    Ok(items)
}

fn owned(bytes: &[u8]) -> Result<Vec<u8>, MsgPackError> {
    let mut data = Vec::new();
    data.try_reserve_exact(bytes.len())
        .map_err(|_| MsgPackError::OutOfMemory)?;
    data.extend_from_slice(bytes);
    Ok(data)
}

impl Builder for ValueBuilder {
    type Value = MsgPackValue;

    fn nil(&mut self) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::Nil)
    }

    fn boolean(&mut self, value: bool) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::Bool(value))
    }

    fn uint(&mut self, value: u64) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::from(value))
    }

    fn int(&mut self, value: i64) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::Integer(value))
    }

    fn float32(&mut self, value: f32) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::Float32(value))
    }

    fn float64(&mut self, value: f64) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::Float64(value))
    }

    fn str(&mut self, bytes: &[u8]) -> Result<MsgPackValue, MsgPackError> {
        if self.raw {
            return Ok(MsgPackValue::Bin(owned(bytes)?));
        }
        let s = std::str::from_utf8(bytes).map_err(|_| MsgPackError::InvalidUtf8)?;
        Ok(MsgPackValue::Str(s.to_owned()))
    }

    fn bin(&mut self, bytes: &[u8]) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::Bin(owned(bytes)?))
    }

    fn ext(&mut self, code: i8, data: &[u8]) -> Result<MsgPackValue, MsgPackError> {
        if code == Timestamp::EXT_TYPE && self.timestamp {
            return Timestamp::from_bytes(data).map(MsgPackValue::Timestamp);
        }
        let ext = ExtType {
            code,
            data: owned(data)?,
        };
        match self.ext_hook.as_mut() {
            Some(hook) => hook(ext),
            None => Ok(MsgPackValue::Ext(ext)),
        }
    }

    fn array_begin(&mut self, len: usize) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::Array(reserved(len)?))
    }

    fn array_item(
        &mut self,
        array: &mut MsgPackValue,
        _index: usize,
        item: MsgPackValue,
    ) -> Result<(), MsgPackError> {
        match array {
            MsgPackValue::Array(items) => {
                items.push(item);
                Ok(())
            }
            _ => Err(MsgPackError::Builder("array item outside of an array".into())),
        }
    }

    fn array_end(&mut self, array: MsgPackValue) -> Result<MsgPackValue, MsgPackError> {
        Ok(array)
    }

    fn map_begin(&mut self, len: usize) -> Result<MsgPackValue, MsgPackError> {
        Ok(MsgPackValue::Map(reserved(len)?))
    }

    fn map_item(
        &mut self,
        map: &mut MsgPackValue,
        _index: usize,
        key: MsgPackValue,
        value: MsgPackValue,
    ) -> Result<(), MsgPackError> {
        if self.strict_map_key && !matches!(key, MsgPackValue::Str(_) | MsgPackValue::Bin(_)) {
            return Err(MsgPackError::InvalidMapKey);
        }
        match map {
            MsgPackValue::Map(pairs) => {
                pairs.push((key, value));
                Ok(())
            }
            _ => Err(MsgPackError::Builder("map entry outside of a map".into())),
        }
    }

    fn map_end(&mut self, map: MsgPackValue) -> Result<MsgPackValue, MsgPackError> {
        Ok(map)
    }
}

/// Builder for skip mode: every callback is a no-op, so the decoder only
/// walks the bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipBuilder;

impl Builder for SkipBuilder {
    type Value = ();

    fn nil(&mut self) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn boolean(&mut self, _: bool) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn uint(&mut self, _: u64) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn int(&mut self, _: i64) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn float32(&mut self, _: f32) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn float64(&mut self, _: f64) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn str(&mut self, _: &[u8]) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn bin(&mut self, _: &[u8]) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn ext(&mut self, _: i8, _: &[u8]) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn array_begin(&mut self, _: usize) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn array_item(&mut self, _: &mut (), _: usize, _: ()) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn array_end(&mut self, _: ()) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn map_begin(&mut self, _: usize) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn map_item(&mut self, _: &mut (), _: usize, _: (), _: ()) -> Result<(), MsgPackError> {
        Ok(())
    }

    fn map_end(&mut self, _: ()) -> Result<(), MsgPackError> {
        Ok(())
    }
}
