//! Callbook-Harvest: a day-by-day callbook birthday harvester
//!
//! This crate walks one calendar year of dated listing pages, follows every
//! detail link found on each listing, and writes one tabular row per detail page.
//! Fetching happens through a single shared transport, optionally bound to an
//! egress proxy for the whole run.

pub mod config;
pub mod crawler;
pub mod output;
pub mod proxy;
pub mod state;
pub mod units;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] proxy::ProxyError),

    #[error("Proxy failure while fetching {url}: {message}")]
    ProxyFailure { url: String, message: String },

    #[error("Output error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid day label: {0}")]
    InvalidDay(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, HttpTransport, Transport};
pub use output::{CsvSink, Record, RecordSink};
pub use proxy::{ProxyBinding, ProxyProvisioner};
pub use state::FetchState;
pub use units::{work_units, WorkUnit};
