//! # Herald Core
//!
//! Transport-facing abstractions for the Herald command router.
//!
//! This crate defines the narrow surface a chat transport has to provide:
//! - [`Message`]: read access to an inbound message (author, content, guild
//!   and channel ids, webhook id, channel kind)
//! - [`Session`]: the bot's own identity and an outbound "send" capability
//!
//! Plus the pieces the router builds on top of them:
//! - [`Tokens`] and [`tokenize`] for command text
//! - [`Filter`] bitsets and their [`Verdict`]

pub mod error;
pub mod filter;
pub mod message;
pub mod session;
pub mod tokens;

pub use error::{ParseFilterError, SendError, SendResult};
pub use filter::{Filter, Verdict};
pub use message::{Author, BoxedMessage, ChannelKind, Message, TextMessage};
pub use session::{BoxedSession, Session};
pub use tokens::{Tokens, tokenize};
