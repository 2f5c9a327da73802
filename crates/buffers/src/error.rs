use thiserror::Error;

/// Error type for buffer reads and writes.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("out of memory: could not allocate {requested} bytes")]
    OutOfMemory { requested: usize },
    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),
}
