//! Error types for the Herald framework.
//!
//! Two families are kept apart by audience:
//! - [`DispatchError`] is attached to a [`Context`](crate::Context) and handed
//!   to the matched handler's `resolve` callback.
//! - [`RouteError`] reports a registration bug to whoever called
//!   [`Router::dispatch`](crate::Router::dispatch).
//!
//! Routing misses are neither; they are reported as [`Outcome::Skipped`].

use std::error::Error as StdError;

use herald_core::Filter;
use thiserror::Error;

/// A boxed error returned by handlers, middlewares and parsers.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors recorded on the context during a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The route's custom parser rejected the command text.
    #[error("failed to parse command: {0}")]
    Parse(BoxError),

    /// One or more filter rules rejected the message.
    #[error("message rejected by filter: {0}")]
    Filtered(Filter),

    /// The filter could not be evaluated because author or session
    /// identity was missing.
    #[error("filter {0} could not be evaluated")]
    Indeterminate(Filter),

    /// A middleware stopped the chain.
    #[error("middleware rejected command: {0}")]
    Middleware(BoxError),

    /// The handler itself failed.
    #[error("{0}")]
    Handler(BoxError),
}

impl DispatchError {
    /// The rejected filter bits, for [`DispatchError::Filtered`].
    pub fn filtered(&self) -> Option<Filter> {
        match self {
            Self::Filtered(bits) => Some(*bits),
            _ => None,
        }
    }

    /// The error a parser, middleware or handler returned.
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Parse(e) | Self::Middleware(e) | Self::Handler(e) => Some(e.as_ref()),
            Self::Filtered(_) | Self::Indeterminate(_) => None,
        }
    }

    /// Downcasts the inner error to a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner().and_then(|e| e.downcast_ref::<E>())
    }
}

/// Registration errors surfaced at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The resolver selected a route that has no handler.
    #[error("route '{}' matched but has no handler bound", .alias.join(" "))]
    NoHandlerBound {
        /// The alias trail that led to the route.
        alias: Vec<String>,
    },
}

/// Why a root route did not take a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Content did not start with the resolved prefix.
    PrefixMismatch,
    /// No route in the tree matched the tokens.
    NoRoute,
    /// The command could not be parsed and the root has no handler to
    /// report it to.
    Unparsed,
    /// A one-shot route has already fired.
    Exhausted,
}

/// Result of running one root route against one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The message was not addressed to this route. No callback ran.
    Skipped(SkipReason),
    /// The pipeline reached the resolver.
    Completed {
        /// Whether an error was attached to the context.
        failed: bool,
    },
}

impl Outcome {
    /// Whether the pipeline reached the resolver.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Result type for a single root route dispatch.
pub type RouteResult = Result<Outcome, RouteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("missing permission")]
    struct Forbidden;

    #[test]
    fn test_downcast_inner() {
        let err = DispatchError::Middleware(Box::new(Forbidden));
        assert!(err.downcast_ref::<Forbidden>().is_some());
        assert_eq!(err.to_string(), "middleware rejected command: missing permission");
        assert!(err.filtered().is_none());
    }

    #[test]
    fn test_filtered_bits() {
        let err = DispatchError::Filtered(Filter::BOT | Filter::EMPTY);
        assert_eq!(err.filtered(), Some(Filter::BOT | Filter::EMPTY));
        assert!(err.inner().is_none());
        assert_eq!(err.to_string(), "message rejected by filter: BOT | EMPTY");
    }

    #[test]
    fn test_no_handler_message() {
        let err = RouteError::NoHandlerBound {
            alias: vec!["root".into(), "sub".into()],
        };
        assert_eq!(err.to_string(), "route 'root sub' matched but has no handler bound");
    }
}
