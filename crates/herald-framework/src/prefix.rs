//! Command prefixes.
//!
//! The root route of a dispatch may carry a [`Prefixer`] that maps the
//! message's guild to the prefix commands must start with. Routes without one
//! accept every message.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Resolves the command prefix for a guild.
pub trait Prefixer: Send + Sync + 'static {
    /// Looks up a guild-specific prefix. `None` falls back to
    /// [`default_prefix`](Self::default_prefix).
    fn load(&self, guild_id: Option<&str>) -> Option<String>;

    fn default_prefix(&self) -> String;

    /// The effective prefix for `guild_id`.
    fn prefix_for(&self, guild_id: Option<&str>) -> String {
        self.load(guild_id).unwrap_or_else(|| self.default_prefix())
    }
}

/// A shared prefixer trait object.
pub type BoxedPrefixer = Arc<dyn Prefixer>;

impl Prefixer for &'static str {
    fn load(&self, _guild_id: Option<&str>) -> Option<String> {
        None
    }

    fn default_prefix(&self) -> String {
        (*self).to_string()
    }
}

impl Prefixer for String {
    fn load(&self, _guild_id: Option<&str>) -> Option<String> {
        None
    }

    fn default_prefix(&self) -> String {
        self.clone()
    }
}

/// The same prefix everywhere.
#[derive(Debug, Clone, Default)]
pub struct StaticPrefix(String);

impl StaticPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }
}

impl Prefixer for StaticPrefix {
    fn load(&self, _guild_id: Option<&str>) -> Option<String> {
        None
    }

    fn default_prefix(&self) -> String {
        self.0.clone()
    }
}

/// A default prefix with per-guild overrides.
///
/// Overrides can be changed while the router is running; clones share the
/// same table.
#[derive(Debug, Clone, Default)]
pub struct PrefixMap {
    default: String,
    guilds: Arc<RwLock<HashMap<String, String>>>,
}

impl PrefixMap {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            guilds: Arc::default(),
        }
    }

    /// Adds an override (builder pattern).
    pub fn with(self, guild_id: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.set(guild_id, prefix);
        self
    }

    /// Sets the prefix for a guild, returning the previous one.
    pub fn set(&self, guild_id: impl Into<String>, prefix: impl Into<String>) -> Option<String> {
        self.guilds.write().insert(guild_id.into(), prefix.into())
    }

    /// Removes a guild override, returning it.
    pub fn remove(&self, guild_id: &str) -> Option<String> {
        self.guilds.write().remove(guild_id)
    }

    pub fn len(&self) -> usize {
        self.guilds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.read().is_empty()
    }
}

impl Prefixer for PrefixMap {
    fn load(&self, guild_id: Option<&str>) -> Option<String> {
        let guild_id = guild_id?;
        self.guilds.read().get(guild_id).cloned()
    }

    fn default_prefix(&self) -> String {
        self.default.clone()
    }
}

/// Strips `prefix` from the start of `content`.
///
/// An empty prefix always matches and returns `content` unchanged. A
/// non-empty prefix must be a literal leading substring and must leave a
/// command with at least one non-whitespace character behind.
pub fn trim_prefix<'a>(content: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(content);
    }
    content
        .strip_prefix(prefix)
        .filter(|rest| !rest.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_empty_prefix() {
        assert_eq!(trim_prefix("echo hi", ""), Some("echo hi"));
        assert_eq!(trim_prefix("", ""), Some(""));
    }

    #[test]
    fn test_trim_literal_prefix() {
        assert_eq!(trim_prefix("e! echo hi", "e!"), Some(" echo hi"));
        assert_eq!(trim_prefix("echo hi", "e!"), None);
        assert_eq!(trim_prefix(" e! echo", "e!"), None);
    }

    #[test]
    fn test_trim_prefix_only_body() {
        assert_eq!(trim_prefix("e!", "e!"), None);
        assert_eq!(trim_prefix("e! ", "e!"), None);
        assert_eq!(trim_prefix("e! \t ", "e!"), None);
        assert_eq!(trim_prefix("e! x", "e!"), Some(" x"));
    }

    #[test]
    fn test_prefix_map_overrides() {
        let map = PrefixMap::new("!").with("g1", "?");
        assert_eq!(map.prefix_for(Some("g1")), "?");
        assert_eq!(map.prefix_for(Some("g2")), "!");
        assert_eq!(map.prefix_for(None), "!");

        let shared = map.clone();
        shared.set("g2", "$");
        assert_eq!(map.prefix_for(Some("g2")), "$");
        assert_eq!(map.remove("g1").as_deref(), Some("?"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_str_prefixer() {
        assert_eq!("t!".prefix_for(Some("g")), "t!");
        assert_eq!(StaticPrefix::new("t!").prefix_for(None), "t!");
    }
}
