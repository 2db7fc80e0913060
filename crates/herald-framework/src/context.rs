//! Per-invocation context.
//!
//! One [`Context`] is created for every (message, root route) pair the
//! router runs. The pipeline fills it in stage by stage; middlewares, the
//! handler and the resolver only ever see it by shared reference.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use herald_core::{BoxedMessage, BoxedSession, Message, SendResult, Session, Tokens};

use crate::error::DispatchError;

/// State carried through one dispatch.
pub struct Context {
    session: BoxedSession,
    message: BoxedMessage,
    prefix: String,
    command: String,
    tokens: Tokens,
    depth: usize,
    err: Option<DispatchError>,
}

impl Context {
    /// Creates a context before any pipeline stage has run.
    ///
    /// Mostly useful for exercising handlers in isolation.
    pub fn new(session: BoxedSession, message: BoxedMessage, prefix: impl Into<String>) -> Self {
        Self {
            session,
            message,
            prefix: prefix.into(),
            command: String::new(),
            tokens: Tokens::default(),
            depth: 0,
            err: None,
        }
    }

    pub(crate) fn set_command(&mut self, command: &str) {
        self.command = command.to_string();
    }

    /// Installs the resolved tokens and how many of them name the route.
    pub fn with_tokens(mut self, tokens: Tokens, depth: usize) -> Self {
        self.depth = depth.min(tokens.len());
        self.tokens = tokens;
        self
    }

    pub(crate) fn set_tokens(&mut self, tokens: Tokens, depth: usize) {
        self.depth = depth.min(tokens.len());
        self.tokens = tokens;
    }

    pub(crate) fn set_err(&mut self, err: DispatchError) {
        self.err = Some(err);
    }

    pub fn session(&self) -> &BoxedSession {
        &self.session
    }

    pub fn message(&self) -> &BoxedMessage {
        &self.message
    }

    /// Downcasts the session to the transport's concrete type.
    pub fn session_as<T: Session>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.session).as_any().downcast::<T>().ok()
    }

    /// Downcasts the message to the transport's concrete type.
    pub fn message_as<T: Message>(&self) -> Option<&T> {
        let any: &dyn Any = self.message.as_any();
        any.downcast_ref::<T>()
    }

    /// The prefix resolved for this message; empty when none applies.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Message content with the prefix stripped.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    /// Number of tokens consumed as the alias trail.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Tokens that selected the route, root first.
    pub fn alias(&self) -> &[String] {
        self.tokens.split_at(self.depth).0
    }

    /// Tokens left after the alias trail.
    pub fn args(&self) -> &[String] {
        self.tokens.split_at(self.depth).1
    }

    /// The error attached by the pipeline, if any.
    pub fn err(&self) -> Option<&DispatchError> {
        self.err.as_ref()
    }

    pub fn failed(&self) -> bool {
        self.err.is_some()
    }

    /// Sends `content` to the channel the message came from.
    pub async fn reply(&self, content: &str) -> SendResult<()> {
        self.session.send(self.message.channel_id(), content).await
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("message", &self.message)
            .field("prefix", &self.prefix)
            .field("alias", &self.alias())
            .field("args", &self.args())
            .field("err", &self.err)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use herald_core::{TextMessage, tokenize};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSession {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Session for RecordingSession {
        fn self_id(&self) -> Option<String> {
            Some("bot".into())
        }

        async fn send(&self, channel_id: &str, content: &str) -> SendResult<()> {
            self.sent.lock().push((channel_id.into(), content.into()));
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[tokio::test]
    async fn test_alias_args_and_reply() {
        let session = Arc::new(RecordingSession::default());
        let message = TextMessage::new("e! echo hello world").channel("c1").boxed();
        let ctx = Context::new(session.clone(), message, "e!")
            .with_tokens(tokenize("echo hello world"), 1);

        assert_eq!(ctx.alias(), ["echo"]);
        assert_eq!(ctx.args(), ["hello", "world"]);
        assert!(!ctx.failed());

        ctx.reply("hello world").await.unwrap();
        assert_eq!(
            session.sent.lock().as_slice(),
            [("c1".to_string(), "hello world".to_string())]
        );
    }

    #[test]
    fn test_downcasts() {
        let session: BoxedSession = Arc::new(RecordingSession::default());
        let message = TextMessage::new("x").channel("c9").boxed();
        let ctx = Context::new(session, message, "");

        assert!(ctx.session_as::<RecordingSession>().is_some());
        assert_eq!(ctx.message_as::<TextMessage>().map(|m| m.channel_id.as_str()), Some("c9"));
    }

    #[test]
    fn test_depth_clamped() {
        let ctx = Context::new(
            Arc::new(RecordingSession::default()),
            TextMessage::new("a").boxed(),
            "",
        )
        .with_tokens(tokenize("a"), 5);
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.args().is_empty());
    }
}
