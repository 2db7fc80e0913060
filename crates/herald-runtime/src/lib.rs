//! Herald Runtime: configuration, logging and message intake.
//!
//! This crate provides:
//! - Layered configuration with figment ([`ConfigLoader`], [`HeraldConfig`])
//! - Logging setup on `tracing-subscriber` ([`LoggingBuilder`])
//! - [`HeraldRuntime`], which queues inbound messages from transports and
//!   dispatches each one on its own task
//!
//! ```ignore
//! use herald_runtime::HeraldRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HeraldRuntime::new(router);
//!     let inbound = runtime.inbound();
//!
//!     tokio::spawn(async move {
//!         while let Some((session, message)) = transport.next().await {
//!             if inbound.deliver(session, message).await.is_err() {
//!                 break;
//!             }
//!         }
//!     });
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, HeraldConfig, LoggingConfig, Profile, RouterConfig,
    RuntimeConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{HeraldRuntime, Inbound, RuntimeBuilder, RuntimeStats};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
