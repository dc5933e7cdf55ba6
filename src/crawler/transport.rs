//! HTTP transport
//!
//! This module handles:
//! - Building the single HTTP client shared by the whole run
//! - Binding that client to the run's proxy endpoints
//! - Classifying transport failures (proxy, timeout, connection, decode)

use crate::config::FetchConfig;
use crate::proxy::ProxyBinding;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Raw response of one GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// HTTP status code
    pub status: u16,
    /// Decoded response body
    pub body: String,
}

/// Transport-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The egress proxy refused or could not be reached
    #[error("proxy failure: {0}")]
    Proxy(String),

    #[error("request timed out")]
    Timeout,

    /// Connect failure on direct egress, or the connection dropped mid-response
    #[error("connection failure: {0}")]
    Connection(String),

    /// The body could not be decoded as text
    #[error("undecodable body: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Fetches pages for the scheduler
///
/// One transport instance is shared by every concurrent fetch of a run.
pub trait Transport {
    fn get(&self, url: &Url) -> impl Future<Output = Result<RawPage, TransportError>> + Send;
}

/// reqwest-backed transport bound to one `ProxyBinding`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    binding: ProxyBinding,
}

impl HttpTransport {
    /// Builds the run's HTTP client
    ///
    /// # Arguments
    ///
    /// * `config` - Fetch configuration (user agent, timeouts)
    /// * `binding` - Proxy endpoints, fixed for the life of the transport
    ///
    /// # Returns
    ///
    /// * `Ok(HttpTransport)` - Successfully built transport
    /// * `Err(reqwest::Error)` - Failed to build client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use callbook_harvest::config::FetchConfig;
    /// use callbook_harvest::crawler::HttpTransport;
    /// use callbook_harvest::proxy::ProxyBinding;
    ///
    /// let transport = HttpTransport::new(&FetchConfig::default(), ProxyBinding::direct()).unwrap();
    /// assert!(transport.binding().is_direct());
    /// ```
    pub fn new(config: &FetchConfig, binding: ProxyBinding) -> Result<Self, reqwest::Error> {
        let builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .gzip(true)
            .brotli(true);

        let client = binding.apply(builder)?.build()?;

        Ok(Self { client, binding })
    }

    pub fn binding(&self) -> &ProxyBinding {
        &self.binding
    }

    /// Whether a request to `url` goes through a proxy endpoint
    fn is_proxied(&self, url: &Url) -> bool {
        match url.scheme() {
            "http" => self.binding.http().is_some(),
            "https" => self.binding.https().is_some(),
            _ => false,
        }
    }

    /// Classifies a failure of `send`, i.e. before any response arrived
    ///
    /// Through a proxy, a connect failure or a deadline hit before the
    /// response head means the egress path itself is broken.
    fn classify_send(&self, url: &Url, error: reqwest::Error) -> TransportError {
        if self.is_proxied(url) && (error.is_connect() || error.is_timeout()) {
            TransportError::Proxy(error.to_string())
        } else {
            classify(error)
        }
    }
}

/// Classifies a failure independent of the egress path
fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() || error.is_request() || error.is_body() {
        TransportError::Connection(error.to_string())
    } else if error.is_decode() {
        TransportError::Decode(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<RawPage, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify_send(url, e))?;

        let status = response.status();
        if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
            return Err(TransportError::Proxy(format!(
                "proxy answered {} for {}",
                status, url
            )));
        }

        let body = response.text().await.map_err(classify)?;

        Ok(RawPage {
            status: status.as_u16(),
            body,
        })
    }
}
