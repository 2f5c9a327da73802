//! Byte buffers for the MessagePack codec.
//!
//! - [`Output`] is the capability the encoder writes through.
//! - [`Writer`] is the sink-less variant: it grows in memory.
//! - [`SinkWriter`] is the sink variant: it flushes to any [`std::io::Write`].
//! - [`Reader`] loads big-endian fields from a byte window.

mod error;
mod output;
mod reader;
mod sink_writer;
mod writer;

pub use error::BufferError;
pub use output::Output;
pub use reader::Reader;
pub use sink_writer::SinkWriter;
pub use writer::Writer;
