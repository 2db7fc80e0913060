//! Error types shared by transports and the router.

use thiserror::Error;

/// Errors a [`Session`](crate::Session) can report when sending a reply.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The session has no live connection.
    #[error("session is not connected")]
    NotConnected,

    /// The platform refused the message.
    #[error("message rejected by platform: {0}")]
    Rejected(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

impl SendError {
    /// Creates an opaque send error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for session sends.
pub type SendResult<T> = Result<T, SendError>;

/// Returned when a filter flag name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter flag '{0}'")]
pub struct ParseFilterError(pub String);
