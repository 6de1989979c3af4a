use std::io;
use std::path::PathBuf;
use std::str::Utf8Error;

use derive_builder::UninitializedFieldError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExchangeError>;

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Text plus its terminating null byte does not fit into a greeting buffer.
    #[error("Message of {len} bytes does not fit into a buffer of {capacity} bytes (including the null terminator)")]
    MessageTooLong { len: usize, capacity: usize },

    /// A received payload was larger than the receive buffer.
    #[error("Message from process #{from_rank} has {len} bytes, but the receive buffer only holds {capacity}")]
    Truncated {
        from_rank: u32,
        len: usize,
        capacity: usize,
    },

    #[error("Message from process #{from_rank} is not valid UTF-8")]
    InvalidText {
        from_rank: u32,
        #[source]
        cause: Utf8Error,
    },

    #[error("Rank {rank} is not part of a group of size {size}")]
    UnknownRank { rank: u32, size: u32 },

    /// The transport to or from a process has been closed.
    #[error("Connection to process #{rank} was closed")]
    Disconnected { rank: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to load config at {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Thread of process #{rank} panicked")]
    ThreadPanicked { rank: u32 },

    #[error("The message passing runtime could not be initialized")]
    RuntimeInit,

    #[error("Process arguments are incomplete: {0}")]
    IncompleteArguments(String),
}

impl From<UninitializedFieldError> for ExchangeError {
    fn from(e: UninitializedFieldError) -> Self {
        ExchangeError::IncompleteArguments(e.field_name().to_string())
    }
}
