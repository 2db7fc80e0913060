//! Session trait.
//!
//! A [`Session`] is the transport's handle on the running bot connection. The
//! router uses it for one thing only: resolving the bot's own identity so
//! self-authored messages can be filtered. Handlers use it to reply.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SendResult;

/// An active bot connection.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// The bot's own user id, if the connection has resolved it yet.
    fn self_id(&self) -> Option<String>;

    /// Sends `content` to `channel_id`.
    async fn send(&self, channel_id: &str, content: &str) -> SendResult<()>;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`.
    ///
    /// ```rust,ignore
    /// fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
    ///     self
    /// }
    /// ```
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared session trait object.
pub type BoxedSession = Arc<dyn Session>;
