//! Configuration for the Herald runtime.
//!
//! Layered loading with figment, a serde schema for router, runtime and
//! logging settings, and validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    HeraldConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, RouterConfig,
    RuntimeConfig, SpanEventConfig,
};
pub use validation::validate_config;
