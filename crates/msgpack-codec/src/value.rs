//! [`MsgPackValue`], the owned value tree produced by the default builder.

use base64::Engine;

use crate::ext::{ExtType, Timestamp};

/// A decoded MessagePack value.
///
/// Integers that fit in `i64` are always [`MsgPackValue::Integer`]; only
/// values above `i64::MAX` use [`MsgPackValue::UInteger`]. Maps keep their
/// wire order and may repeat keys.
#[derive(Debug, Clone, PartialEq)]
pub enum MsgPackValue {
    Nil,
    Bool(bool),
    Integer(i64),
    /// Unsigned integer > i64::MAX
    UInteger(u64),
    Float32(f32),
    Float64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<MsgPackValue>),
    Map(Vec<(MsgPackValue, MsgPackValue)>),
    Ext(ExtType),
    Timestamp(Timestamp),
}

impl MsgPackValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, MsgPackValue::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MsgPackValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MsgPackValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MsgPackValue::Integer(i) => u64::try_from(*i).ok(),
            MsgPackValue::UInteger(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MsgPackValue::Float32(f) => Some(f64::from(*f)),
            MsgPackValue::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MsgPackValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            MsgPackValue::Bin(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[MsgPackValue]> {
        match self {
            MsgPackValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(MsgPackValue, MsgPackValue)]> {
        match self {
            MsgPackValue::Map(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Looks up the first entry whose key is the string `key`.
    pub fn get(&self, key: &str) -> Option<&MsgPackValue> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }
}

impl From<bool> for MsgPackValue {
    fn from(b: bool) -> Self {
        MsgPackValue::Bool(b)
    }
}

impl From<i64> for MsgPackValue {
    fn from(i: i64) -> Self {
        MsgPackValue::Integer(i)
    }
}

impl From<u64> for MsgPackValue {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => MsgPackValue::Integer(i),
            Err(_) => MsgPackValue::UInteger(u),
        }
    }
}

impl From<f32> for MsgPackValue {
    fn from(f: f32) -> Self {
        MsgPackValue::Float32(f)
    }
}

impl From<f64> for MsgPackValue {
    fn from(f: f64) -> Self {
        MsgPackValue::Float64(f)
    }
}

impl From<&str> for MsgPackValue {
    fn from(s: &str) -> Self {
        MsgPackValue::Str(s.to_owned())
    }
}

impl From<String> for MsgPackValue {
    fn from(s: String) -> Self {
        MsgPackValue::Str(s)
    }
}

impl From<Vec<u8>> for MsgPackValue {
    fn from(b: Vec<u8>) -> Self {
        MsgPackValue::Bin(b)
    }
}

impl From<Vec<MsgPackValue>> for MsgPackValue {
    fn from(items: Vec<MsgPackValue>) -> Self {
        MsgPackValue::Array(items)
    }
}

impl From<ExtType> for MsgPackValue {
    fn from(ext: ExtType) -> Self {
        MsgPackValue::Ext(ext)
    }
}

impl From<Timestamp> for MsgPackValue {
    fn from(ts: Timestamp) -> Self {
        MsgPackValue::Timestamp(ts)
    }
}

impl From<serde_json::Value> for MsgPackValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => MsgPackValue::Nil,
            serde_json::Value::Bool(b) => MsgPackValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MsgPackValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    MsgPackValue::UInteger(u)
                } else {
                    MsgPackValue::Float64(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => MsgPackValue::Str(s),
            serde_json::Value::Array(arr) => {
                MsgPackValue::Array(arr.into_iter().map(MsgPackValue::from).collect())
            }
            serde_json::Value::Object(obj) => MsgPackValue::Map(
                obj.into_iter()
                    .map(|(k, v)| (MsgPackValue::Str(k), MsgPackValue::from(v)))
                    .collect(),
            ),
        }
    }
}

fn data_uri(bytes: &[u8]) -> serde_json::Value {
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    serde_json::Value::String(format!("data:application/octet-stream;base64,{}", b64))
}

/// JSON object keys must be strings: non-str keys are rendered as their
/// JSON text.
fn json_key(key: MsgPackValue) -> String {
    match key {
        MsgPackValue::Str(s) => s,
        other => serde_json::Value::from(other).to_string(),
    }
}

impl From<MsgPackValue> for serde_json::Value {
    fn from(v: MsgPackValue) -> Self {
        match v {
            MsgPackValue::Nil => serde_json::Value::Null,
            MsgPackValue::Bool(b) => serde_json::Value::Bool(b),
            MsgPackValue::Integer(i) => serde_json::json!(i),
            MsgPackValue::UInteger(u) => serde_json::json!(u),
            MsgPackValue::Float32(f) => serde_json::json!(f64::from(f)),
            MsgPackValue::Float64(f) => serde_json::json!(f),
            MsgPackValue::Str(s) => serde_json::Value::String(s),
            MsgPackValue::Bin(b) => data_uri(&b),
            MsgPackValue::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            MsgPackValue::Map(pairs) => serde_json::Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (json_key(k), serde_json::Value::from(v)))
                    .collect(),
            ),
            MsgPackValue::Ext(ext) => data_uri(&ext.data),
            MsgPackValue::Timestamp(ts) => serde_json::json!(ts.to_f64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let value = MsgPackValue::from(json!({"a": [1, -2, 1.5, null, true], "b": "x"}));
        assert_eq!(
            value.get("a"),
            Some(&MsgPackValue::Array(vec![
                MsgPackValue::Integer(1),
                MsgPackValue::Integer(-2),
                MsgPackValue::Float64(1.5),
                MsgPackValue::Nil,
                MsgPackValue::Bool(true),
            ]))
        );
        assert_eq!(value.get("b").and_then(MsgPackValue::as_str), Some("x"));
        assert_eq!(
            MsgPackValue::from(json!(u64::MAX)),
            MsgPackValue::UInteger(u64::MAX)
        );
    }

    #[test]
    fn test_to_json() {
        let value = MsgPackValue::Map(vec![
            (MsgPackValue::from("bin"), MsgPackValue::Bin(vec![1, 2, 3])),
            (MsgPackValue::Integer(5), MsgPackValue::Nil),
        ]);
        assert_eq!(
            serde_json::Value::from(value),
            json!({
                "bin": "data:application/octet-stream;base64,AQID",
                "5": null,
            })
        );
    }

    #[test]
    fn test_u64_normalization() {
        assert_eq!(MsgPackValue::from(5u64), MsgPackValue::Integer(5));
        assert_eq!(MsgPackValue::from(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(MsgPackValue::Integer(-1).as_u64(), None);
    }
}
