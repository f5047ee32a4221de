//! # Broadcast Errors
//!
//! Error types for channel transports. The broadcast driver logs these and
//! carries on; none of them reach store consumers.

use thiserror::Error;

/// Result type for broadcast operations
pub type BroadcastResult<T> = Result<T, BroadcastError>;

/// Broadcast errors
#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    /// Transport refused to open the channel
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    /// Channel was closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Message too large
    #[error("Message too large (max: {0} bytes)")]
    MessageTooLarge(usize),

    /// Message could not be encoded
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
