//! Resumable MessagePack decoding.
//!
//! A [`Context`] walks the wire format with an explicit state and container
//! stack, handing each token to a [`Builder`]. Input may arrive in any number
//! of chunks; a value split across chunks is resumed, never re-parsed.
//! [`SkipBuilder`] turns the same walk into a skip.

mod builder;
mod context;
mod header;

pub use builder::{Builder, ExtHook, SkipBuilder, ValueBuilder};
pub use context::Context;
pub use header::{read_array_header, read_map_header};

/// Decoder that discards what it reads.
pub type SkipContext = Context<SkipBuilder>;
