//! Route tree nodes.
//!
//! A [`Route`] is one node of a command tree: a set of aliases, an optional
//! handler, the middlewares that guard it, and its subroutes. Trees are
//! built with consuming builder calls and are read-only once handed to a
//! [`Router`](crate::Router).
//!
//! A route with no aliases is a *default* route. As the root of a dispatch it
//! matches every command without consuming a token. As a subroute it never
//! matches, so its parent stays the match.
//!
//! # Example
//!
//! ```rust,ignore
//! use herald_framework::{Route, StaticPrefix};
//!
//! let root = Route::new()
//!     .aliases(["echo", "e"])
//!     .prefixer(StaticPrefix::new("e!"))
//!     .handler(echo)
//!     .subroute(Route::new().aliases(["fmt", "f"]).handler(echo_fmt));
//! ```
//!
//! # Cheap Cloning
//!
//! `Route` keeps its data behind an `Arc`; builder calls copy on write.

use std::fmt;
use std::sync::Arc;

use herald_core::Filter;

use crate::handler::{
    BoxedHandler, BoxedMiddleware, BoxedParser, CommandParser, Handler, Middleware,
};
use crate::prefix::{BoxedPrefixer, Prefixer};

#[derive(Clone, Default)]
struct RouteInner {
    /// Lower-cased aliases; empty for a default route.
    aliases: Vec<String>,
    prefixer: Option<BoxedPrefixer>,
    handler: Option<BoxedHandler>,
    parser: Option<BoxedParser>,
    middlewares: Vec<BoxedMiddleware>,
    filter: Filter,
    subroutes: Vec<Route>,
    name: Option<String>,
}

/// A node in a command tree.
#[derive(Clone, Default)]
pub struct Route {
    inner: Arc<RouteInner>,
}

impl Route {
    /// Creates an empty default route.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner_mut(&mut self) -> &mut RouteInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Adds an alias. Aliases match case-insensitively.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.inner_mut().aliases.push(alias.into().to_lowercase());
        self
    }

    /// Adds several aliases.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner_mut()
            .aliases
            .extend(aliases.into_iter().map(|a| a.into().to_lowercase()));
        self
    }

    /// Appends a subroute.
    ///
    /// Among subroutes that match equally deep, the one added last wins.
    pub fn subroute(mut self, route: Route) -> Self {
        self.inner_mut().subroutes.push(route);
        self
    }

    /// Appends several subroutes, in order.
    pub fn subroutes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.inner_mut().subroutes.extend(routes);
        self
    }

    /// Appends a middleware. Middlewares run in the order they are added.
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.inner_mut().middlewares.push(Arc::new(middleware));
        self
    }

    /// Sets the handler, replacing any previous one.
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.inner_mut().handler = Some(Arc::new(handler));
        self
    }

    /// Sets a pre-built shared handler.
    pub fn handler_boxed(mut self, handler: BoxedHandler) -> Self {
        self.inner_mut().handler = Some(handler);
        self
    }

    /// Sets the prefix resolver. Only consulted on the root of a dispatch.
    pub fn prefixer<P: Prefixer>(mut self, prefixer: P) -> Self {
        self.inner_mut().prefixer = Some(Arc::new(prefixer));
        self
    }

    /// Sets a custom command parser. Only consulted on the root of a
    /// dispatch.
    pub fn parser<P: CommandParser>(mut self, parser: P) -> Self {
        self.inner_mut().parser = Some(Arc::new(parser));
        self
    }

    /// Adds exclusion rules that apply when this route or any route below it
    /// is matched.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.inner_mut().filter |= filter;
        self
    }

    /// Sets a name for this route (useful for debugging).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner_mut().name = Some(name.into());
        self
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Whether this route has no aliases.
    pub fn is_default(&self) -> bool {
        self.inner.aliases.is_empty()
    }

    /// Whether `token` matches one of this route's aliases.
    ///
    /// A default route has no aliases and matches nothing here.
    pub fn has_alias(&self, token: &str) -> bool {
        if self.is_default() {
            return false;
        }
        let token = token.to_lowercase();
        self.inner.aliases.iter().any(|a| *a == token)
    }

    /// The first subroute with the alias `token`.
    pub fn find(&self, token: &str) -> Option<&Route> {
        self.inner.subroutes.iter().find(|r| r.has_alias(token))
    }

    /// Every subroute with the alias `token`, in registration order.
    pub fn find_all<'s>(&'s self, token: &str) -> impl Iterator<Item = &'s Route> {
        self.inner.subroutes.iter().filter(move |r| r.has_alias(token))
    }

    pub fn get_aliases(&self) -> &[String] {
        &self.inner.aliases
    }

    pub fn get_subroutes(&self) -> &[Route] {
        &self.inner.subroutes
    }

    pub fn get_handler(&self) -> Option<&BoxedHandler> {
        self.inner.handler.as_ref()
    }

    pub fn get_prefixer(&self) -> Option<&BoxedPrefixer> {
        self.inner.prefixer.as_ref()
    }

    pub fn get_parser(&self) -> Option<&BoxedParser> {
        self.inner.parser.as_ref()
    }

    pub fn get_middlewares(&self) -> &[BoxedMiddleware] {
        &self.inner.middlewares
    }

    pub fn get_filter(&self) -> Filter {
        self.inner.filter
    }

    /// Returns the name of this route, if set.
    pub fn get_name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// A label for logs: the name, else the first alias.
    pub(crate) fn label(&self) -> &str {
        self.get_name()
            .or_else(|| self.inner.aliases.first().map(String::as_str))
            .unwrap_or("default")
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.inner.name)
            .field("aliases", &self.inner.aliases)
            .field("has_handler", &self.inner.handler.is_some())
            .field("middlewares", &self.inner.middlewares.len())
            .field("filter", &self.inner.filter)
            .field("subroutes", &self.inner.subroutes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_are_case_insensitive() {
        let route = Route::new().aliases(["Echo", "e"]);
        assert!(route.has_alias("ECHO"));
        assert!(route.has_alias("echo"));
        assert!(route.has_alias("E"));
        assert!(!route.has_alias("ec"));
        assert_eq!(route.get_aliases(), ["echo", "e"]);
    }

    #[test]
    fn test_default_route_has_no_alias() {
        let route = Route::new();
        assert!(route.is_default());
        assert!(!route.has_alias(""));
        assert!(!route.has_alias("anything"));
    }

    #[test]
    fn test_find_and_find_all() {
        let root = Route::new()
            .alias("root")
            .subroute(Route::new().alias("sub").name("first"))
            .subroute(Route::new())
            .subroute(Route::new().aliases(["sub", "s"]).name("second"));

        assert_eq!(root.find("sub").and_then(Route::get_name), Some("first"));
        assert_eq!(root.find("s").and_then(Route::get_name), Some("second"));
        let names: Vec<_> = root.find_all("SUB").filter_map(Route::get_name).collect();
        assert_eq!(names, ["first", "second"]);
        assert!(root.find("missing").is_none());
    }

    #[test]
    fn test_builder_copy_on_write() {
        let base = Route::new().alias("a");
        let extended = base.clone().alias("b").filter(Filter::BOT);
        assert_eq!(base.get_aliases(), ["a"]);
        assert_eq!(extended.get_aliases(), ["a", "b"]);
        assert!(base.get_filter().is_empty());
        assert_eq!(extended.get_filter(), Filter::BOT);
    }
}
