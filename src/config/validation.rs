use crate::config::types::{
    AutoscaleConfig, Config, CrawlerConfig, IndexerConfig, OutputConfig, RankingConfig,
    RetryConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_indexer_config(&config.indexer)?;
    validate_ranking_config(&config.ranking)?;
    validate_autoscale_config(&config.autoscale)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 1000, got {}",
            config.batch_size
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.idle_backoff_ms == 0 {
        return Err(ConfigError::Validation(
            "idle_backoff_ms must be > 0".to_string(),
        ));
    }

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // The name doubles as the robots.txt product token: alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_indexer_config(config: &IndexerConfig) -> Result<(), ConfigError> {
    if config.intake_capacity == 0 {
        return Err(ConfigError::Validation(
            "intake_capacity must be >= 1".to_string(),
        ));
    }
    if config.max_concurrent == 0 {
        return Err(ConfigError::Validation(
            "indexer max_concurrent must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_ranking_config(config: &RankingConfig) -> Result<(), ConfigError> {
    if !(config.damping > 0.0 && config.damping < 1.0) {
        return Err(ConfigError::Validation(format!(
            "damping must be in (0, 1), got {}",
            config.damping
        )));
    }
    if config.max_iterations == 0 {
        return Err(ConfigError::Validation(
            "max_iterations must be >= 1".to_string(),
        ));
    }
    if config.tolerance <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "tolerance must be > 0, got {}",
            config.tolerance
        )));
    }
    if config.write_chunk_size == 0 {
        return Err(ConfigError::Validation(
            "write_chunk_size must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_autoscale_config(config: &AutoscaleConfig) -> Result<(), ConfigError> {
    if config.min_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "min_workers must be >= 1, got {}",
            config.min_workers
        )));
    }

    if config.max_workers < config.min_workers {
        return Err(ConfigError::Validation(format!(
            "max_workers ({}) must be >= min_workers ({})",
            config.max_workers, config.min_workers
        )));
    }

    if config.target_rate <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "target_rate must be > 0, got {}",
            config.target_rate
        )));
    }

    if !(0.0..1.0).contains(&config.band) {
        return Err(ConfigError::Validation(format!(
            "band must be in [0, 1), got {}",
            config.band
        )));
    }

    if config.interval_ms == 0 {
        return Err(ConfigError::Validation(
            "interval_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
