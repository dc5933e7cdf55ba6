//! Configuration module for Callbook-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Command-line flags are applied on top of the loaded values by the binary.
//!
//! # Example
//!
//! ```no_run
//! use callbook_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Batch concurrency: {}", config.fetch.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, FetchConfig, OutputConfig, ProxyConfig, ProxyMode, SelectorConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::validate;
