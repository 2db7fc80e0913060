//! Message exclusion filters.
//!
//! A [`Filter`] is a small bitset. Each bit names one category of message
//! that should not reach a handler. Bits combine with `|`, and
//! [`Filter::evaluate`] checks every enabled rule against a message,
//! reporting all of the rules that rejected it at once.
//!
//! ```rust
//! use herald_core::{Author, Filter, TextMessage, Verdict};
//! # use herald_core::{Session, SendResult};
//! # use std::{any::Any, sync::Arc};
//! # struct Me;
//! # #[async_trait::async_trait]
//! # impl Session for Me {
//! #     fn self_id(&self) -> Option<String> { Some("me".into()) }
//! #     async fn send(&self, _: &str, _: &str) -> SendResult<()> { Ok(()) }
//! #     fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
//! # }
//!
//! let filter = Filter::BOT | Filter::EMPTY;
//! let msg = TextMessage::new("").sent_by(Author::bot("42"));
//!
//! assert_eq!(filter.evaluate(&msg, &Me), Verdict::Rejected(filter));
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ParseFilterError;
use crate::message::Message;
use crate::session::Session;

/// A set of message exclusion rules.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Filter(u8);

impl Filter {
    /// No rules.
    pub const NONE: Self = Self(0);
    /// Reject messages sent by the session's own identity.
    pub const SELF: Self = Self(1 << 0);
    /// Reject messages sent by automated accounts.
    pub const BOT: Self = Self(1 << 1);
    /// Reject messages posted through webhooks.
    pub const WEBHOOK: Self = Self(1 << 2);
    /// Reject messages with empty content.
    pub const EMPTY: Self = Self(1 << 3);
    /// Reject messages in private channels.
    pub const PRIVATE: Self = Self(1 << 4);
    /// Reject messages in guild text channels.
    pub const GUILD: Self = Self(1 << 5);
    /// Every rule.
    pub const ALL: Self = Self(0b0011_1111);

    const NAMED: [(Self, &'static str); 6] = [
        (Self::SELF, "SELF"),
        (Self::BOT, "BOT"),
        (Self::WEBHOOK, "WEBHOOK"),
        (Self::EMPTY, "EMPTY"),
        (Self::PRIVATE, "PRIVATE"),
        (Self::GUILD, "GUILD"),
    ];

    /// Builds a filter from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Iterates over the single-flag filters set in `self`.
    pub fn iter(self) -> impl Iterator<Item = Filter> {
        Self::NAMED
            .into_iter()
            .map(|(flag, _)| flag)
            .filter(move |flag| self.contains(*flag))
    }

    /// Upper-case names of the flags set in `self`.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }

    /// Evaluates every enabled rule against `message`.
    ///
    /// Identity rules need data the transport may not have: `SELF` needs both
    /// an author and the session's own id, `BOT` needs an author. When that
    /// data is missing the result is [`Verdict::Indeterminate`] rather than a
    /// rule failure.
    pub fn evaluate(self, message: &dyn Message, session: &dyn Session) -> Verdict {
        let mut failed = Self::NONE;

        if self.contains(Self::SELF) {
            let (Some(author), Some(self_id)) = (message.author(), session.self_id()) else {
                trace!("Author or session identity missing, filter indeterminate");
                return Verdict::Indeterminate;
            };
            if author.id == self_id {
                failed |= Self::SELF;
            }
        }

        if self.contains(Self::BOT) {
            let Some(author) = message.author() else {
                trace!("Author missing, filter indeterminate");
                return Verdict::Indeterminate;
            };
            if author.bot {
                failed |= Self::BOT;
            }
        }

        if self.contains(Self::WEBHOOK) && message.webhook_id().is_some_and(|w| !w.is_empty()) {
            failed |= Self::WEBHOOK;
        }

        if self.contains(Self::EMPTY) && message.content().is_empty() {
            failed |= Self::EMPTY;
        }

        if self.contains(Self::PRIVATE) && message.is_private() {
            failed |= Self::PRIVATE;
        }

        if self.contains(Self::GUILD) && message.is_guild_text() {
            failed |= Self::GUILD;
        }

        if failed.is_empty() {
            Verdict::Passed
        } else {
            Verdict::Rejected(failed)
        }
    }
}

/// Outcome of [`Filter::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No enabled rule rejected the message.
    Passed,
    /// The listed rules rejected the message.
    Rejected(Filter),
    /// Required author or session data was missing.
    Indeterminate,
}

impl Verdict {
    pub fn passed(self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Flattens into `(passed, failed_bits)`.
    ///
    /// An indeterminate verdict is `(false, Filter::NONE)`.
    pub fn into_parts(self) -> (bool, Filter) {
        match self {
            Self::Passed => (true, Filter::NONE),
            Self::Rejected(bits) => (false, bits),
            Self::Indeterminate => (false, Filter::NONE),
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

impl BitOr for Filter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Filter {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Filter {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl FromIterator<Filter> for Filter {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, |acc, f| acc | f)
    }
}

// ============================================================================
// Formatting and parsing
// ============================================================================

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for name in self.names() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({self})")
    }
}

impl FromStr for Filter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("all") {
            return Ok(Self::ALL);
        }
        if name.eq_ignore_ascii_case("none") {
            return Ok(Self::NONE);
        }
        Self::NAMED
            .into_iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(flag, _)| flag)
            .ok_or_else(|| ParseFilterError(s.to_string()))
    }
}

impl TryFrom<Vec<String>> for Filter {
    type Error = ParseFilterError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        names.iter().map(|n| n.parse::<Filter>()).collect()
    }
}

impl From<Filter> for Vec<String> {
    fn from(filter: Filter) -> Self {
        filter.names().map(str::to_lowercase).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SendResult;
    use crate::message::{Author, ChannelKind, TextMessage};
    use async_trait::async_trait;
    use std::any::Any;
    use std::sync::Arc;

    struct MockSession(Option<&'static str>);

    #[async_trait]
    impl Session for MockSession {
        fn self_id(&self) -> Option<String> {
            self.0.map(str::to_string)
        }

        async fn send(&self, _channel_id: &str, _content: &str) -> SendResult<()> {
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    const ME: MockSession = MockSession(Some("me"));

    #[test]
    fn test_no_rules_always_pass() {
        let msg = TextMessage::new("");
        assert_eq!(Filter::NONE.evaluate(&msg, &ME), Verdict::Passed);
    }

    #[test]
    fn test_accumulates_every_failing_rule() {
        let msg = TextMessage::new("").sent_by(Author::bot("42"));
        let filter = Filter::BOT | Filter::EMPTY;
        let verdict = filter.evaluate(&msg, &ME);
        assert_eq!(verdict, Verdict::Rejected(Filter::BOT | Filter::EMPTY));
        assert_eq!(verdict.into_parts(), (false, filter));
    }

    #[test]
    fn test_self_rule() {
        let own = TextMessage::new("hi").sent_by(Author::bot("me"));
        let other = TextMessage::new("hi").sent_by(Author::user("you"));
        assert_eq!(
            Filter::SELF.evaluate(&own, &ME),
            Verdict::Rejected(Filter::SELF)
        );
        assert!(Filter::SELF.evaluate(&other, &ME).passed());
    }

    #[test]
    fn test_missing_identity_is_indeterminate() {
        let anonymous = TextMessage::new("hi");
        assert_eq!(
            Filter::SELF.evaluate(&anonymous, &ME),
            Verdict::Indeterminate
        );
        assert_eq!(
            Filter::BOT.evaluate(&anonymous, &ME),
            Verdict::Indeterminate
        );

        let msg = TextMessage::new("hi").sent_by(Author::user("you"));
        let verdict = Filter::SELF.evaluate(&msg, &MockSession(None));
        assert_eq!(verdict, Verdict::Indeterminate);
        assert_eq!(verdict.into_parts(), (false, Filter::NONE));
    }

    #[test]
    fn test_channel_rules() {
        let dm = TextMessage::new("hi").kind(ChannelKind::Direct);
        let guild = TextMessage::new("hi").guild("g");
        assert_eq!(
            Filter::PRIVATE.evaluate(&dm, &ME),
            Verdict::Rejected(Filter::PRIVATE)
        );
        assert!(Filter::PRIVATE.evaluate(&guild, &ME).passed());
        assert_eq!(
            Filter::GUILD.evaluate(&guild, &ME),
            Verdict::Rejected(Filter::GUILD)
        );
    }

    #[test]
    fn test_webhook_rule() {
        let hooked = TextMessage::new("hi").webhook("w1");
        assert_eq!(
            Filter::WEBHOOK.evaluate(&hooked, &ME),
            Verdict::Rejected(Filter::WEBHOOK)
        );
        let blank_hook = TextMessage::new("hi").webhook("");
        assert!(Filter::WEBHOOK.evaluate(&blank_hook, &ME).passed());
    }

    #[test]
    fn test_evaluate_leaves_filter_untouched() {
        let filter = Filter::BOT | Filter::EMPTY;
        let msg = TextMessage::new("").sent_by(Author::bot("42"));
        let first = filter.evaluate(&msg, &ME);
        let second = filter.evaluate(&msg, &ME);
        assert_eq!(first, second);
        assert_eq!(filter, Filter::BOT | Filter::EMPTY);
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(Filter::NONE.to_string(), "NONE");
        assert_eq!((Filter::BOT | Filter::SELF).to_string(), "SELF | BOT");
        assert_eq!("bot".parse::<Filter>(), Ok(Filter::BOT));
        assert_eq!(" Guild ".parse::<Filter>(), Ok(Filter::GUILD));
        assert!("robots".parse::<Filter>().is_err());
    }

    #[test]
    fn test_serde_as_names() {
        let filter: Filter = serde_json::from_str(r#"["self", "bot"]"#).unwrap();
        assert_eq!(filter, Filter::SELF | Filter::BOT);
        assert_eq!(
            serde_json::to_string(&filter).unwrap(),
            r#"["self","bot"]"#
        );
        assert!(serde_json::from_str::<Filter>(r#"["nope"]"#).is_err());
    }

    #[test]
    fn test_iter_and_truncate() {
        let filter = Filter::from_bits_truncate(0xff);
        assert_eq!(filter, Filter::ALL);
        assert_eq!(filter.iter().count(), 6);
        assert!(filter.contains(Filter::WEBHOOK | Filter::EMPTY));
    }
}
