use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Search base URL is set, page size is not 0
/// - Retry policy makes at least one attempt and never shrinks delays
/// - Poll and snapshot intervals are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    // Search validation
    if config.search.base_url.trim().is_empty() {
        return Err(invalid("search.base_url cannot be empty"));
    }
    if config.search.page_size == 0 {
        return Err(invalid("search.page_size cannot be 0"));
    }
    if config.search.retry.max_attempts == 0 {
        return Err(invalid("search.retry.max_attempts cannot be 0"));
    }
    let multiplier = config.search.retry.multiplier;
    if multiplier.is_nan() || multiplier < 1.0 {
        return Err(invalid("search.retry.multiplier must be at least 1.0"));
    }

    // Intervals
    if config.poller.interval_secs == 0 {
        return Err(invalid("poller.interval_secs cannot be 0"));
    }
    if config.snapshot.interval_secs == 0 {
        return Err(invalid("snapshot.interval_secs cannot be 0"));
    }

    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}
