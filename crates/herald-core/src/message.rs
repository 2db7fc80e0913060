//! Inbound message abstraction.
//!
//! A transport adapter wraps whatever payload its platform delivers in a type
//! implementing [`Message`]. The router only reads the handful of fields it
//! needs for filtering and prefix lookup; handlers can reach the concrete
//! payload again through [`Message::as_any`].
//!
//! [`TextMessage`] is a plain serde-friendly implementation for adapters
//! that do not carry a richer payload, and for tests.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The sender of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Platform user identifier.
    pub id: String,
    /// Whether the account is automated.
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    /// Creates a human author.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bot: false,
        }
    }

    /// Creates an automated author.
    pub fn bot(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bot: true,
        }
    }
}

/// The kind of channel a message was posted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A private conversation with one user.
    Direct,
    /// A text channel inside a guild.
    GuildText,
    /// Any other channel type (threads, voice text, ...).
    Other,
    /// The transport did not report a channel type.
    #[default]
    Unknown,
}

/// Read access to an inbound message.
pub trait Message: Send + Sync + Debug + 'static {
    /// The author, if the transport resolved one.
    fn author(&self) -> Option<&Author>;

    /// Text content of the message.
    fn content(&self) -> &str;

    /// Guild (tenant) identifier; `None` outside guilds.
    fn guild_id(&self) -> Option<&str>;

    /// Channel the message was posted in. Replies go here.
    fn channel_id(&self) -> &str;

    /// Webhook identifier when the message was posted by a webhook.
    fn webhook_id(&self) -> Option<&str> {
        None
    }

    fn channel_kind(&self) -> ChannelKind {
        ChannelKind::Unknown
    }

    /// Whether the message was sent in a private channel.
    ///
    /// Falls back to the absence of a guild id when the channel kind is
    /// unknown.
    fn is_private(&self) -> bool {
        match self.channel_kind() {
            ChannelKind::Direct => true,
            ChannelKind::Unknown => self.guild_id().is_none_or(str::is_empty),
            _ => false,
        }
    }

    /// Whether the message was sent in a guild text channel.
    fn is_guild_text(&self) -> bool {
        match self.channel_kind() {
            ChannelKind::GuildText => true,
            ChannelKind::Unknown => self.guild_id().is_some_and(|g| !g.is_empty()),
            _ => false,
        }
    }

    /// Returns self as `&dyn Any` for downcasting to the adapter payload.
    fn as_any(&self) -> &dyn Any;
}

/// A shared message trait object.
pub type BoxedMessage = Arc<dyn Message>;

/// A plain text message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub webhook_id: Option<String>,
    #[serde(default)]
    pub channel_kind: ChannelKind,
}

impl TextMessage {
    /// Creates a message with the given content and no other metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Parses a message from its JSON form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn sent_by(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    pub fn webhook(mut self, webhook_id: impl Into<String>) -> Self {
        self.webhook_id = Some(webhook_id.into());
        self
    }

    pub fn kind(mut self, kind: ChannelKind) -> Self {
        self.channel_kind = kind;
        self
    }

    /// Wraps the message for delivery to the router.
    pub fn boxed(self) -> BoxedMessage {
        Arc::new(self)
    }
}

impl Message for TextMessage {
    fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn guild_id(&self) -> Option<&str> {
        self.guild_id.as_deref()
    }

    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn webhook_id(&self) -> Option<&str> {
        self.webhook_id.as_deref()
    }

    fn channel_kind(&self) -> ChannelKind {
        self.channel_kind
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
