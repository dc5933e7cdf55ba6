//! Proxy provisioning
//!
//! This module handles:
//! - The `ProxyBinding` value threaded into the transport at construction
//! - The `ProxyProvisioner` capability and its implementations
//! - Acquiring the binding once at startup from configuration

mod binding;
mod fixed;
mod free_list;

pub use binding::ProxyBinding;
pub use fixed::StaticProxies;
pub use free_list::{parse_proxy_table, select_candidates, FreeProxyList, ProxyCandidate};

use crate::config::{ProxyConfig, ProxyMode};
use std::future::Future;
use thiserror::Error;

/// Errors that can occur while acquiring a proxy
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("There is no available proxy: {0}")]
    Unavailable(String),

    #[error("Invalid proxy endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to load proxy list {url}: {message}")]
    List { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// What the caller would like from a proxy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyCriteria {
    /// Preferred two-letter country codes; empty means any region
    pub regions: Vec<String>,

    /// Whether an endpoint outside `regions` is acceptable as a last resort
    pub fallback_any_region: bool,
}

impl ProxyCriteria {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            regions: config.regions.clone(),
            fallback_any_region: config.fallback_any_region,
        }
    }
}

/// A source of egress proxy endpoints
///
/// Implementations may return any working endpoint or fail with
/// `ProxyError::Unavailable`; the caller never falls back to direct egress.
pub trait ProxyProvisioner {
    fn acquire(
        &self,
        criteria: &ProxyCriteria,
    ) -> impl Future<Output = Result<ProxyBinding, ProxyError>> + Send;
}

/// Acquires the run's binding according to `config.mode`
///
/// # Arguments
///
/// * `config` - The proxy configuration
/// * `user_agent` - User agent used when downloading proxy lists
///
/// # Returns
///
/// * `Ok(ProxyBinding)` - The binding for the whole run (direct in mode `none`)
/// * `Err(ProxyError)` - No proxy could be acquired
pub async fn provision(config: &ProxyConfig, user_agent: &str) -> Result<ProxyBinding, ProxyError> {
    let criteria = ProxyCriteria::from_config(config);

    let binding = match config.mode {
        ProxyMode::None => return Ok(ProxyBinding::direct()),
        ProxyMode::Static => StaticProxies::from_config(config)?.acquire(&criteria).await?,
        ProxyMode::FreeList => {
            FreeProxyList::from_config(config, user_agent)?
                .acquire(&criteria)
                .await?
        }
    };

    tracing::info!("Proxy bound: {}", binding);
    Ok(binding)
}
