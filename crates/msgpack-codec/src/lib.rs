//! MessagePack encoding and resumable decoding.
//!
//! - [`MsgPackEncoder`] packs values into a growable [`Writer`] or through a
//!   [`SinkWriter`] into any `std::io::Write`.
//! - [`decoder::Context`] decodes input that arrives in arbitrary chunks,
//!   driving a [`decoder::Builder`] that assembles the result.
//! - [`Unpacker`] wraps both for streams of concatenated values.
//!
//! ```
//! use msgpack_codec::{packb, unpackb, MsgPackValue};
//!
//! let value = MsgPackValue::Array(vec![MsgPackValue::Integer(1), MsgPackValue::from("two")]);
//! let bytes = packb(&value).unwrap();
//! assert_eq!(bytes, b"\x92\x01\xa3two");
//! assert_eq!(unpackb(&bytes).unwrap(), value);
//! ```

pub mod constants;
pub mod decoder;
mod encoder;
mod error;
mod ext;
mod options;
mod unpacker;
mod util;
mod value;

pub use encoder::MsgPackEncoder;
pub use error::{EncodeError, LengthKind, MsgPackError};
pub use ext::{ExtType, Timestamp};
pub use msgpack_buffers::{BufferError, Output, SinkWriter, Writer};
pub use options::{DecoderOptions, EncoderOptions, Limits};
pub use unpacker::Unpacker;
pub use util::{pack_to, packb, packb_with, unpackb, unpackb_with};
pub use value::MsgPackValue;
