//! Error types for rotatelog
//!
//! Provides a unified error type for all operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using RotateError
pub type Result<T> = std::result::Result<T, RotateError>;

/// Unified error type for rotatelog operations
#[derive(Debug, Error)]
pub enum RotateError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Rotation Errors
    // -------------------------------------------------------------------------
    #[error("rotation failed while {step}: {source}")]
    Rotation {
        step: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to compress {}: {source}", .path.display())]
    Compression {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writer is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("unknown compression algorithm {0:?}")]
    UnknownCompression(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RotateError {
    pub(crate) fn rotation(step: &'static str, source: io::Error) -> Self {
        RotateError::Rotation { step, source }
    }
}

impl From<RotateError> for io::Error {
    fn from(err: RotateError) -> Self {
        match err {
            RotateError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
