//! # Herald
//!
//! Prefix and alias based command routing for chat bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────────┐   ┌────────────────────────────────────────┐
//! │ Transport │──▶│ HeraldRuntime   │──▶│ Router (one task per message)          │
//! │ (adapter) │   │ (Inbound queue) │   │  root route A: prefix → parse → resolve│──▶ handler
//! └───────────┘   └─────────────────┘   │  root route B: ...                     │──▶ handler
//!                                       └────────────────────────────────────────┘
//! ```
//!
//! - **Transports** implement [`Session`](core::Session) and
//!   [`Message`](core::Message) and push messages into an
//!   [`Inbound`](runtime::Inbound) handle
//! - **Routes** form an alias tree. The deepest match wins, later siblings
//!   win ties, and leftover tokens become the handler's arguments
//! - **Filters** exclude messages by author and channel before the handler
//!   runs; the route's resolver always sees the outcome
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! let echo = Route::new()
//!     .alias("echo")
//!     .alias("e")
//!     .prefixer("e!")
//!     .filter(Filter::SELF | Filter::BOT)
//!     .handler(handler_fn(|ctx| {
//!         Box::pin(async move {
//!             ctx.reply(&ctx.args().join(" ")).await?;
//!             Ok::<(), BoxError>(())
//!         })
//!     }));
//!
//! let runtime = HeraldRuntime::new(Router::new().route(echo));
//! let inbound = runtime.inbound();
//! // hand `inbound` to a transport, then:
//! runtime.run().await?;
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `herald.toml` (default)
//! - `yaml-config`: read `herald.yaml`
//! - `json-log`: JSON log output

pub use herald_core as core;
pub use herald_framework as framework;
pub use herald_runtime as runtime;

/// Commonly used types for building a bot.
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use herald_runtime::{HeraldConfig, HeraldRuntime, Inbound, RuntimeStats};

    // Routing
    pub use herald_framework::{
        BoxError, Context, DispatchError, Outcome, RouteError, Route, Router, SkipReason,
    };

    // Handlers and middleware
    pub use herald_framework::{
        CommandParser, Handler, HandlerResult, Middleware, ShellParser, handler_fn, middleware_fn,
    };

    // Prefixes
    pub use herald_framework::{PrefixMap, Prefixer, StaticPrefix};

    // Transport-facing types
    pub use herald_core::{
        Author, BoxedMessage, BoxedSession, ChannelKind, Filter, Message, SendError, SendResult,
        Session, TextMessage, Tokens,
    };
}
