use crate::config::types::{Config, CrawlerConfig, DirectoryConfig, OutputConfig, TuningConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on `recent-seeds-capacity`
const MAX_RECENT_SEEDS: usize = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_tuning_config(&config.tuning)?;
    validate_directory_config(&config.directory)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.iteration_delay < 100 {
        return Err(ConfigError::Validation(format!(
            "iteration_delay must be >= 100ms, got {}ms",
            config.iteration_delay
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.cache_clear_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "cache_clear_interval must be >= 1, got {}",
            config.cache_clear_interval
        )));
    }

    if config.recent_seeds_capacity < 1 || config.recent_seeds_capacity > MAX_RECENT_SEEDS {
        return Err(ConfigError::Validation(format!(
            "recent_seeds_capacity must be between 1 and {}, got {}",
            MAX_RECENT_SEEDS,
            config.recent_seeds_capacity
        )));
    }

    if config.max_fetch_retries < 1 || config.max_fetch_retries > 20 {
        return Err(ConfigError::Validation(format!(
            "max_fetch_retries must be between 1 and 20, got {}",
            config.max_fetch_retries
        )));
    }

    Ok(())
}

/// Validates the prioritisation constants
fn validate_tuning_config(config: &TuningConfig) -> Result<(), ConfigError> {
    for (name, factor) in [
        ("deferral_factor", config.deferral_factor),
        ("sweep_deferral_factor", config.sweep_deferral_factor),
        ("cascade_factor", config.cascade_factor),
    ] {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "{} must be in (0, 1], got {}",
                name, factor
            )));
        }
    }

    if config.boost_cap < 1 || config.bootstrap_boost_cap < 1 {
        return Err(ConfigError::Validation(
            "boost caps must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates directory configuration
fn validate_directory_config(config: &DirectoryConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.api_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "api_url must use HTTP(S), got '{}'",
            config.api_url
        )));
    }

    if config.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "client_id cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > 200 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 200, got {}",
            config.page_size
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.graph_dir.is_empty() {
        return Err(ConfigError::Validation(
            "graph_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
