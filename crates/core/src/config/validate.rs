use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Engine path is set
/// - At least one job may run at a time
/// - A configured timeout is not 0
/// - The poll interval is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Engine validation
    if config.engine.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.path cannot be empty".to_string(),
        ));
    }

    if config.engine.max_parallel_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "engine.max_parallel_jobs cannot be 0".to_string(),
        ));
    }

    if config.engine.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "engine.timeout_secs cannot be 0; omit it to disable the timeout".to_string(),
        ));
    }

    if config.engine.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "engine.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    Ok(())
}
