//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{HeraldConfig, LogOutput, LoggingConfig, RouterConfig, RuntimeConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HeraldConfig) -> ConfigResult<()> {
    validate_router_config(&config.router)?;
    validate_runtime_config(&config.runtime)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_router_config(router: &RouterConfig) -> ConfigResult<()> {
    if router.prefixes.keys().any(|guild| guild.trim().is_empty()) {
        return Err(ConfigError::validation(
            "Guild ids in router.prefixes cannot be empty",
        ));
    }
    Ok(())
}

fn validate_runtime_config(runtime: &RuntimeConfig) -> ConfigResult<()> {
    if runtime.queue_capacity == 0 {
        return Err(ConfigError::validation(
            "runtime.queue_capacity must be greater than 0",
        ));
    }

    if runtime.max_in_flight == Some(0) {
        return Err(ConfigError::validation(
            "runtime.max_in_flight must be greater than 0 when set",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }
    Ok(())
}
