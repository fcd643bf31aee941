use crate::config::types::{
    CacheConfig, Config, ContentConfig, DiscoveryConfig, EngineConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Hard ceiling on cached pages
pub const MAX_CACHE_ENTRIES: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(&config.engine)?;
    validate_cache_config(&config.cache)?;
    validate_content_config(&config.content)?;
    validate_discovery_config(&config.discovery)?;
    validate_user_agent_config(&config.user_agent)?;
    for pattern in &config.security.trusted_hosts {
        validate_host_pattern(pattern)?;
    }
    Ok(())
}

fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 50 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 50, got {}",
            config.concurrency
        )));
    }

    if config.attempt_budget < 1 || config.attempt_budget > 10 {
        return Err(ConfigError::Validation(format!(
            "attempt_budget must be between 1 and 10, got {}",
            config.attempt_budget
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.run_deadline_secs < 1 {
        return Err(ConfigError::Validation(
            "run_deadline_secs must be >= 1".to_string(),
        ));
    }

    if config.max_documents < 1 {
        return Err(ConfigError::Validation(
            "max_documents must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.max_entries < 1 || config.max_entries > MAX_CACHE_ENTRIES {
        return Err(ConfigError::Validation(format!(
            "cache max_entries must be between 1 and {}, got {}",
            MAX_CACHE_ENTRIES, config.max_entries
        )));
    }

    if config.enabled && config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_content_config(config: &ContentConfig) -> Result<(), ConfigError> {
    if !(config.duplicate_threshold > 0.0 && config.duplicate_threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "duplicate_threshold must be in (0, 1], got {}",
            config.duplicate_threshold
        )));
    }

    if config.shingle_size < 1 {
        return Err(ConfigError::Validation(
            "shingle_size must be >= 1".to_string(),
        ));
    }

    if config.soft_failure_markers.iter().any(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "soft_failure_markers cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.max_sitemap_urls > 10_000 {
        return Err(ConfigError::Validation(format!(
            "max_sitemap_urls must be at most 10000, got {}",
            config.max_sitemap_urls
        )));
    }

    if config.max_changelog_candidates > 20 {
        return Err(ConfigError::Validation(format!(
            "max_changelog_candidates must be at most 20, got {}",
            config.max_changelog_candidates
        )));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user agent name cannot be empty".to_string(),
        ));
    }

    if !config
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "user agent name must contain only alphanumeric characters, '-' or '_', got '{}'",
            config.name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::Validation(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates a trusted-host pattern (exact host, IP literal or `*.domain`)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            pattern
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' has misplaced dots",
            pattern
        )));
    }

    Ok(())
}
