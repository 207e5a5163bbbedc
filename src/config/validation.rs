use crate::config::types::{
    ClassifierConfig, Config, ControlConfig, CrawlerConfig, FilterConfig, SessionConfig,
    StorageConfig,
};
use crate::url::normalize_url;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Hard cap on link depth from a seed
pub const MAX_DEPTH: u32 = 3;

/// Minimum per-domain spacing between fetches (milliseconds)
pub const MIN_CRAWL_DELAY_MS: u64 = 2000;

/// Minimum wait after an identity rotation (milliseconds)
pub const MIN_SETTLE_MS: u64 = 2000;

/// Upper bound on a single fetch (seconds)
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 30;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_session_config(&config.session)?;
    if let Some(control) = &config.control {
        validate_control_config(control)?;
    }
    validate_classifier_config(&config.classifier)?;
    validate_storage_config(&config.storage)?;
    validate_filter_config(&config.filter)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth > MAX_DEPTH {
        return Err(ConfigError::Validation(format!(
            "max-depth must be <= {}, got {}",
            MAX_DEPTH, config.max_depth
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.crawl_delay_ms < MIN_CRAWL_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "crawl-delay-ms must be >= {}ms, got {}ms",
            MIN_CRAWL_DELAY_MS, config.crawl_delay_ms
        )));
    }

    if config.max_requests_per_domain < 1 {
        return Err(ConfigError::Validation(format!(
            "max-requests-per-domain must be >= 1, got {}",
            config.max_requests_per_domain
        )));
    }

    if config.fetch_timeout_secs < 1 || config.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "fetch-timeout-secs must be between 1 and {}, got {}",
            MAX_FETCH_TIMEOUT_SECS, config.fetch_timeout_secs
        )));
    }

    if config.network_suffixes.is_empty() {
        return Err(ConfigError::Validation(
            "network-suffixes cannot be empty".to_string(),
        ));
    }

    for pattern in &config.network_suffixes {
        validate_network_pattern(pattern)?;
    }

    for seed in &config.seeds {
        normalize_url(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
        })?;
    }

    Ok(())
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if let Some(proxy) = &config.proxy {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "socks5" | "socks5h" | "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "proxy scheme must be socks5, socks5h, http or https, got '{}'",
                url.scheme()
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.settle_ms < MIN_SETTLE_MS {
        return Err(ConfigError::Validation(format!(
            "settle-ms must be >= {}ms, got {}ms",
            MIN_SETTLE_MS, config.settle_ms
        )));
    }

    Ok(())
}

/// Validates the control channel section
fn validate_control_config(config: &ControlConfig) -> Result<(), ConfigError> {
    let (host, port) = config.address.rsplit_once(':').ok_or_else(|| {
        ConfigError::Validation(format!(
            "control address must be host:port, got '{}'",
            config.address
        ))
    })?;

    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(ConfigError::Validation(format!(
            "control address must be host:port, got '{}'",
            config.address
        )));
    }

    if config.password.is_some() && config.cookie_path.is_some() {
        return Err(ConfigError::Validation(
            "control section accepts either password or cookie-path, not both".to_string(),
        ));
    }

    Ok(())
}

/// Validates the keyword category table
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "classifier needs at least one keyword category".to_string(),
        ));
    }

    if config.seller_indicator_threshold < 1 {
        return Err(ConfigError::Validation(
            "seller-indicator-threshold must be >= 1".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for category in &config.categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(category.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category '{}'",
                category.name
            )));
        }

        if !(30..=100).contains(&category.weight) {
            return Err(ConfigError::Validation(format!(
                "category '{}' weight must be between 30 and 100, got {}",
                category.name, category.weight
            )));
        }

        if category.keywords.is_empty() || category.keywords.iter().any(|k| k.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "category '{}' needs non-empty keywords",
                category.name
            )));
        }
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "storage path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates risk level thresholds
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if !(config.low_risk < config.medium_risk
        && config.medium_risk < config.high_risk
        && config.high_risk <= 100)
    {
        return Err(ConfigError::Validation(format!(
            "risk thresholds must ascend within 0..=100, got {}/{}/{}",
            config.low_risk, config.medium_risk, config.high_risk
        )));
    }
    Ok(())
}

/// Validates a hidden-network host pattern such as `*.onion`
fn validate_network_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Network pattern cannot be empty".to_string(),
        ));
    }

    let base = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(base)
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
