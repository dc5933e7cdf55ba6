use crate::config::types::{
    Config, CrawlConfig, FetchConfig, OutputConfig, ProxyConfig, ProxyMode, SelectorConfig,
};
use crate::units::parse_day;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound for `backoff-factor` and `backoff-max-secs`
const MAX_BACKOFF_SECS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl, config.year())?;
    validate_fetch_config(&config.fetch)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates the harvest window and target site
fn validate_crawl_config(config: &CrawlConfig, year: i32) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    if !config.listing_path.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "listing-path must end with '/', got '{}'",
            config.listing_path
        )));
    }

    if config.unit_concurrency < 1 {
        return Err(ConfigError::Validation(
            "unit-concurrency must be >= 1".to_string(),
        ));
    }

    let first = config
        .first_day
        .as_deref()
        .map(|label| parse_day(year, label))
        .transpose()?;
    let last = config
        .last_day
        .as_deref()
        .map(|label| parse_day(year, label))
        .transpose()?;

    if let (Some(first), Some(last)) = (first, last) {
        if first > last {
            return Err(ConfigError::Validation(format!(
                "first-day {} is after last-day {}",
                first, last
            )));
        }
    }

    Ok(())
}

/// Validates transport and retry settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs and connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    // The request timeout is a whole-request deadline, connect phase included
    if config.connect_timeout_secs >= config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs ({}) must be lower than timeout-secs ({})",
            config.connect_timeout_secs, config.timeout_secs
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    for (key, value) in [
        ("backoff-factor", config.backoff_factor),
        ("backoff-max-secs", config.backoff_max_secs),
    ] {
        if !value.is_finite() || !(0.0..=MAX_BACKOFF_SECS).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 0 and {} seconds, got {}",
                key, MAX_BACKOFF_SECS, value
            )));
        }
    }

    if config.concurrency < 1 || config.concurrency > 500 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 500, got {}",
            config.concurrency
        )));
    }

    Ok(())
}

/// Validates proxy acquisition settings
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    match config.mode {
        ProxyMode::None => {}
        ProxyMode::Static => {
            if config.http.is_none() && config.https.is_none() {
                return Err(ConfigError::Validation(
                    "proxy mode 'static' needs at least one of http / https".to_string(),
                ));
            }
            for endpoint in config.http.iter().chain(config.https.iter()) {
                Url::parse(endpoint).map_err(|e| {
                    ConfigError::InvalidUrl(format!("Invalid proxy endpoint '{}': {}", endpoint, e))
                })?;
            }
        }
        ProxyMode::FreeList => {
            for (key, value) in [
                ("list-url", &config.list_url),
                ("https-list-url", &config.https_list_url),
                ("probe-url", &config.probe_url),
                ("https-probe-url", &config.https_probe_url),
            ] {
                Url::parse(value)
                    .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", key, e)))?;
            }

            if config.max_candidates < 1 {
                return Err(ConfigError::Validation(
                    "max-candidates must be >= 1".to_string(),
                ));
            }
        }
    }

    for region in &config.regions {
        if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Validation(format!(
                "proxy region must be a two-letter country code, got '{}'",
                region
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that every selector compiles
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.listing_links,
        &config.call_sign,
        &config.name_original,
        &config.name_english,
    ] {
        Selector::parse(selector).map_err(|e| {
            ConfigError::Validation(format!("invalid selector '{}': {:?}", selector, e))
        })?;
    }

    Ok(())
}
