//! # Herald Framework
//!
//! Route matching and dispatch for chat commands.
//!
//! This layer provides:
//! - [`Route`] trees built with a consuming builder
//! - The recursive [`resolve`] algorithm (deepest match, later siblings win
//!   ties)
//! - The per-message pipeline run by [`Router`]: prefix, parse, resolve,
//!   filter, middlewares, handler, resolver
//! - [`Prefixer`] implementations and a shell-style [`ShellParser`]
//!
//! Transports feed it through the [`Session`](herald_core::Session) and
//! [`Message`](herald_core::Message) traits from `herald-core`.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod prefix;
pub mod resolver;
pub mod route;
pub mod split;

pub use context::Context;
pub use dispatcher::{Invocation, Router};
pub use error::{BoxError, DispatchError, Outcome, RouteError, RouteResult, SkipReason};
pub use handler::{
    BoxFuture, BoxedHandler, BoxedMiddleware, BoxedParser, CommandParser, Handler, HandlerFn,
    HandlerResult, Middleware, MiddlewareFn, handler_fn, middleware_fn,
};
pub use prefix::{BoxedPrefixer, PrefixMap, Prefixer, StaticPrefix, trim_prefix};
pub use resolver::{Resolution, resolve};
pub use route::Route;
pub use split::{ShellParser, ShellSplitError, shell_split};

pub use herald_core::{Filter, Tokens, Verdict};
