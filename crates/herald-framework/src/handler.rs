//! Handler, middleware and parser capabilities.
//!
//! A route carries at most one [`Handler`], any number of [`Middleware`]s and
//! an optional [`CommandParser`]. They are ordinary trait objects chosen at
//! registration time, so the dispatch path never inspects a handler for
//! optional behaviour.
//!
//! Closures can be used directly through [`handler_fn`] and
//! [`middleware_fn`]:
//!
//! ```rust,ignore
//! use herald_framework::{Route, handler_fn};
//!
//! let echo = Route::new()
//!     .aliases(["echo", "e"])
//!     .handler(handler_fn(|ctx| Box::pin(async move {
//!         ctx.reply(&ctx.args().join(" ")).await?;
//!         Ok(())
//!     })));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::Tokens;

use crate::context::Context;
use crate::error::BoxError;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result returned by handlers.
pub type HandlerResult = Result<(), BoxError>;

// ============================================================================
// Handler
// ============================================================================

/// User business logic bound to a route.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Runs the command. Any error is attached to the context.
    async fn handle(&self, ctx: &Context) -> HandlerResult;

    /// Runs after the pipeline has finished with a matched route, whether or
    /// not it failed. Inspect [`Context::err`] to report failures.
    ///
    /// The default does nothing.
    async fn resolve(&self, _ctx: &Context) {}
}

/// A shared handler trait object.
pub type BoxedHandler = Arc<dyn Handler>;

type ResolveFn = Arc<dyn for<'a> Fn(&'a Context) -> BoxFuture<'a, ()> + Send + Sync>;

/// A [`Handler`] built from closures. See [`handler_fn`].
pub struct HandlerFn<F> {
    handle: F,
    resolve: Option<ResolveFn>,
}

/// Wraps a closure returning a boxed future into a [`Handler`].
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    HandlerFn {
        handle: f,
        resolve: None,
    }
}

impl<F> HandlerFn<F> {
    /// Sets the resolve callback.
    pub fn on_resolve<R>(mut self, r: R) -> Self
    where
        R: for<'a> Fn(&'a Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.resolve = Some(Arc::new(r));
        self
    }
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    async fn handle(&self, ctx: &Context) -> HandlerResult {
        (self.handle)(ctx).await
    }

    async fn resolve(&self, ctx: &Context) {
        if let Some(r) = &self.resolve {
            r(ctx).await;
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// A check run before the handler, in registration order.
///
/// Returning an error stops the chain; the handler never runs and the error
/// reaches the resolver.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn run(&self, ctx: &Context) -> Result<(), BoxError>;
}

/// A shared middleware trait object.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A [`Middleware`] built from a closure. See [`middleware_fn`].
pub struct MiddlewareFn<F>(F);

/// Wraps a closure returning a boxed future into a [`Middleware`].
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a Context) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
{
    MiddlewareFn(f)
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a Context) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
{
    async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
        (self.0)(ctx).await
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Replaces the default whitespace tokenizer for a root route.
///
/// Any `Fn(&str) -> Result<Tokens, BoxError>` is a parser.
pub trait CommandParser: Send + Sync + 'static {
    fn parse(&self, command: &str) -> Result<Tokens, BoxError>;
}

impl<F> CommandParser for F
where
    F: Fn(&str) -> Result<Tokens, BoxError> + Send + Sync + 'static,
{
    fn parse(&self, command: &str) -> Result<Tokens, BoxError> {
        self(command)
    }
}

/// A shared parser trait object.
pub type BoxedParser = Arc<dyn CommandParser>;
