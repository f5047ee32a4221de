//! # Durable Store Errors
//!
//! Raised by backends. The driver logs and swallows them: reads become
//! absent, writes are dropped.

use thiserror::Error;

/// Result type for durable store operations
pub type DurableResult<T> = Result<T, DurableError>;

/// Durable store errors
#[derive(Debug, Error)]
pub enum DurableError {
    /// Backend could not open the partition
    #[error("Failed to open {namespace}: {reason}")]
    OpenFailed { namespace: String, reason: String },

    /// Read failed
    #[error("Read of '{key}' failed: {reason}")]
    ReadFailed { key: String, reason: String },

    /// Write or delete failed
    #[error("Write of '{key}' failed: {reason}")]
    WriteFailed { key: String, reason: String },

    /// Stored bytes are not valid JSON
    #[error("Stored value for '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DurableError {
    /// Partition could not be opened
    pub fn open_failed(namespace: impl ToString, reason: impl ToString) -> Self {
        DurableError::OpenFailed {
            namespace: namespace.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Read of a key failed
    pub fn read_failed(key: impl Into<String>, reason: impl ToString) -> Self {
        DurableError::ReadFailed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Put or delete of a key failed
    pub fn write_failed(key: impl Into<String>, reason: impl ToString) -> Self {
        DurableError::WriteFailed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
