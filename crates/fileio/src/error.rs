//! Error types for file pattern resolution and CSV row I/O.

use thiserror::Error;

/// Errors surfaced by the fileio crate.
#[derive(Debug, Error, Clone)]
pub enum FileIoError {
    /// IO error occurred while accessing a path.
    #[error("IO error at {path}: {message}")]
    Io {
        /// Path where the error occurred.
        path: String,
        /// Error message.
        message: String,
    },

    /// CSV-level read or write failure.
    #[error("CSV error in {path}: {message}")]
    Csv {
        /// File being read or written.
        path: String,
        /// Error message.
        message: String,
    },
}

impl FileIoError {
    /// Create an Io error from std::io::Error.
    ///
    /// # Arguments
    /// * `path` - Path where the error occurred
    /// * `err` - The underlying IO error
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
