//! Dispatch pipeline and router.
//!
//! The [`Router`] holds any number of root routes. For every inbound message
//! each root runs its own pipeline, concurrently with the others:
//!
//! 1. Resolve the prefix through the root's prefixer (empty without one)
//! 2. Strip it from the content; a mismatch skips this root
//! 3. Tokenize, with the root's parser if it has one; a parse error goes
//!    straight to the root handler's resolver, or skips a root without one
//! 4. Resolve the route tree; no match skips this root
//! 5. Check the combined filter of the router and every route on the path
//! 6. Run the matched route's middlewares in order
//! 7. Run the handler
//! 8. Run the handler's resolver, whatever happened in 5-7
//!
//! ```rust,ignore
//! use herald_framework::{Filter, Route, Router, StaticPrefix};
//!
//! let router = Router::new()
//!     .filter(Filter::SELF | Filter::BOT)
//!     .route(
//!         Route::new()
//!             .aliases(["echo", "e"])
//!             .prefixer(StaticPrefix::new("e!"))
//!             .handler(echo),
//!     )
//!     .route_once(Route::new().alias("hello").handler(greet));
//!
//! let outcomes = router.dispatch(session, message).await;
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context as TaskContext, Poll};

use futures::future::join_all;
use herald_core::{BoxedMessage, BoxedSession, Filter, Verdict, tokenize};
use tower::Service;
use tracing::{Instrument, debug, debug_span, error, trace};

use crate::context::Context;
use crate::error::{DispatchError, Outcome, RouteError, RouteResult, SkipReason};
use crate::handler::Handler;
use crate::prefix::trim_prefix;
use crate::resolver::resolve;
use crate::route::Route;

struct RouteEntry {
    route: Route,
    /// `Some` for one-shot routes; set once the route has fired.
    fired: Option<AtomicBool>,
}

impl RouteEntry {
    fn is_exhausted(&self) -> bool {
        self.fired
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Marks a one-shot route as fired. Returns `false` if it already had.
    fn claim(&self) -> bool {
        match &self.fired {
            Some(flag) => !flag.swap(true, Ordering::AcqRel),
            None => true,
        }
    }
}

/// The set of root routes a bot answers to.
///
/// # Thread Safety
///
/// `Router` is `Send + Sync` and cheap to clone; clones share routes and
/// one-shot state.
#[derive(Clone, Default)]
pub struct Router {
    entries: Vec<Arc<RouteEntry>>,
    filter: Filter,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root route.
    pub fn route(mut self, route: Route) -> Self {
        self.entries.push(Arc::new(RouteEntry { route, fired: None }));
        self
    }

    /// Adds a root route that handles a single message and is skipped
    /// afterwards.
    ///
    /// The route is used up by the first message that matches it and passes
    /// its filters. Rejected messages still reach its resolver and do not
    /// consume it.
    pub fn route_once(mut self, route: Route) -> Self {
        self.entries.push(Arc::new(RouteEntry {
            route,
            fired: Some(AtomicBool::new(false)),
        }));
        self
    }

    /// Adds exclusion rules applied to every route.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter |= filter;
        self
    }

    pub fn get_filter(&self) -> Filter {
        self.filter
    }

    /// Returns the number of root routes.
    pub fn route_count(&self) -> usize {
        self.entries.len()
    }

    /// Runs every root route against `message`.
    ///
    /// Returns one result per root route, in registration order.
    pub async fn dispatch(&self, session: BoxedSession, message: BoxedMessage) -> Vec<RouteResult> {
        let runs = self.entries.iter().map(|entry| {
            let span = debug_span!(
                "dispatch",
                route = entry.route.label(),
                channel = message.channel_id()
            );
            run_pipeline(
                entry,
                self.filter,
                Arc::clone(&session),
                Arc::clone(&message),
            )
            .instrument(span)
        });

        join_all(runs).await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("route_count", &self.entries.len())
            .field("filter", &self.filter)
            .finish()
    }
}

async fn run_pipeline(
    entry: &RouteEntry,
    router_filter: Filter,
    session: BoxedSession,
    message: BoxedMessage,
) -> RouteResult {
    let root = &entry.route;

    let prefix = root
        .get_prefixer()
        .map(|p| p.prefix_for(message.guild_id()))
        .unwrap_or_default();

    let Some(command) = trim_prefix(message.content(), &prefix) else {
        trace!(prefix = %prefix, "Prefix mismatch, skipping");
        return Ok(Outcome::Skipped(SkipReason::PrefixMismatch));
    };

    let mut ctx = Context::new(Arc::clone(&session), Arc::clone(&message), prefix.as_str());
    ctx.set_command(command);

    let parsed = match root.get_parser() {
        Some(parser) => parser.parse(command),
        None => Ok(tokenize(command)),
    };
    let tokens = match parsed {
        Ok(tokens) => tokens,
        Err(e) => {
            debug!(error = %e, "Command parse failed");
            let Some(handler) = root.get_handler() else {
                return Ok(Outcome::Skipped(SkipReason::Unparsed));
            };
            ctx.set_err(DispatchError::Parse(e));
            handler.resolve(&ctx).await;
            return Ok(Outcome::Completed { failed: true });
        }
    };

    let Some(resolution) = resolve(root, tokens.as_slice()) else {
        trace!(tokens = ?tokens.as_slice(), "No route matched, skipping");
        return Ok(Outcome::Skipped(SkipReason::NoRoute));
    };

    let route = resolution.route();
    let depth = resolution.depth();

    let Some(handler) = route.get_handler() else {
        let alias = tokens.split_at(depth).0.to_vec();
        error!(alias = ?alias, "Matched route has no handler bound");
        return Err(RouteError::NoHandlerBound { alias });
    };

    if entry.is_exhausted() {
        trace!("One-shot route already fired, skipping");
        return Ok(Outcome::Skipped(SkipReason::Exhausted));
    }

    let filter = resolution
        .chain()
        .iter()
        .fold(router_filter, |acc, r| acc | r.get_filter());

    ctx.set_tokens(tokens, depth);
    debug!(
        matched = route.label(),
        depth,
        args = ctx.args().len(),
        "Route resolved"
    );

    match filter.evaluate(&*message, &*session) {
        Verdict::Passed => {
            // Lost the race to a concurrent dispatch of the same one-shot route.
            if !entry.claim() {
                trace!("One-shot route fired concurrently, skipping");
                return Ok(Outcome::Skipped(SkipReason::Exhausted));
            }
            run_handler(&mut ctx, route, handler.as_ref()).await;
        }
        Verdict::Rejected(bits) => {
            debug!(failed = %bits, "Message rejected by filter");
            ctx.set_err(DispatchError::Filtered(bits));
        }
        Verdict::Indeterminate => {
            debug!(filter = %filter, "Filter could not be evaluated");
            ctx.set_err(DispatchError::Indeterminate(filter));
        }
    }

    handler.resolve(&ctx).await;

    let failed = ctx.failed();
    debug!(failed, "Dispatch completed");
    Ok(Outcome::Completed { failed })
}

/// Runs the middleware chain and, if it passes, the handler.
async fn run_handler(ctx: &mut Context, route: &Route, handler: &dyn Handler) {
    for (i, middleware) in route.get_middlewares().iter().enumerate() {
        trace!(middleware_index = i, "Running middleware");
        if let Err(e) = middleware.run(ctx).await {
            debug!(middleware_index = i, error = %e, "Middleware stopped the chain");
            ctx.set_err(DispatchError::Middleware(e));
            return;
        }
    }

    trace!("Running handler");
    if let Err(e) = handler.handle(ctx).await {
        debug!(error = %e, "Handler returned an error");
        ctx.set_err(DispatchError::Handler(e));
    }
}

// ============================================================================
// Tower Service Implementation for Router
// ============================================================================

/// One inbound message together with the session it arrived on.
#[derive(Clone)]
pub struct Invocation {
    pub session: BoxedSession,
    pub message: BoxedMessage,
}

impl Invocation {
    pub fn new(session: BoxedSession, message: BoxedMessage) -> Self {
        Self { session, message }
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Tower Service implementation for Router.
///
/// This allows applying Tower middleware (timeout, concurrency limits, etc.)
/// around a whole dispatch.
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
/// use tower::timeout::TimeoutLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(TimeoutLayer::new(Duration::from_secs(5)))
///     .service(router);
/// ```
impl Service<Invocation> for Router {
    type Response = Vec<RouteResult>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        let router = self.clone();

        Box::pin(async move {
            Ok(router
                .dispatch(invocation.session, invocation.message)
                .await)
        })
    }
}
