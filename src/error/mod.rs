//! Error types for rasterpool.

use std::path::PathBuf;

use thiserror::Error;

use crate::buffer::Shape;

/// Result type for pool and copy operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur during pool and copy operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No idle buffer is left and the pool already allocated `limit` buffers.
    #[error("pool exhausted: capacity limit of {limit} buffers reached")]
    Exhausted {
        /// The hard ceiling on allocated buffers.
        limit: usize,
    },

    /// The path is blank or does not name an existing file.
    #[error("path is not valid: {}", path.display())]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
    },

    /// The pool was released and can no longer be used.
    #[error("pool has been released")]
    Released,

    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// A source or destination pointer was null.
    #[error("null pointer passed to copy")]
    NullPointer,

    /// A byte region does not have the required length.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Number of bytes required.
        expected: usize,
        /// Number of bytes supplied.
        actual: usize,
    },

    /// A buffer or decoded image does not match the pool's shape.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Shape of the pool.
        expected: Shape,
        /// Shape that was supplied.
        actual: Shape,
    },

    /// A bounded copy wait expired before every chunk ran.
    ///
    /// The destination holds a partial copy: only `completed` of `total`
    /// chunks were written.
    #[error("copy timed out: {completed} of {total} chunks completed")]
    CopyTimeout {
        /// Chunks that were copied.
        completed: usize,
        /// Chunks the copy was split into.
        total: usize,
    },

    /// The returned buffer was never issued by this pool, or was returned twice.
    #[error("buffer was not issued by this pool or was already returned")]
    ForeignBuffer,

    /// The image decoder failed.
    #[cfg(feature = "decode")]
    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),
}

impl PoolError {
    /// Returns `true` for conditions callers are expected to branch on.
    ///
    /// Everything else signals a programming error at the call site.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PoolError::Exhausted { .. }
            | PoolError::InvalidPath { .. }
            | PoolError::CopyTimeout { .. } => true,
            #[cfg(feature = "decode")]
            PoolError::Decode(_) => true,
            _ => false,
        }
    }
}
