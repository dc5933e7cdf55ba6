//! Fetch scheduler
//!
//! This module handles:
//! - Running a batch of page requests concurrently with a bounded fan-out
//! - Per-request retry with exponential backoff on transient failures
//! - Degrading a request once its retries are exhausted
//! - Escalating proxy failures to a run-level error that cancels the batch

use crate::config::FetchConfig;
use crate::crawler::transport::{RawPage, Transport, TransportError};
use crate::state::{FetchState, FetchTracker};
use crate::units::WorkUnit;
use crate::HarvestError;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// What a page is fetched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRole {
    /// Dated page listing detail links
    Listing,
    /// Page holding one record
    Detail,
}

/// A page to fetch
///
/// `id` identifies the request inside its batch; results come back in
/// completion order and are matched to requests by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub id: usize,
    pub url: Url,
    pub unit: WorkUnit,
    pub role: PageRole,
}

impl PageRequest {
    pub fn new(id: usize, url: Url, unit: WorkUnit, role: PageRole) -> Self {
        Self {
            id,
            url,
            unit,
            role,
        }
    }
}

/// Successfully fetched content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,
    /// Page body
    pub body: String,
}

impl FetchedPage {
    pub fn byte_len(&self) -> usize {
        self.body.len()
    }
}

impl From<RawPage> for FetchedPage {
    fn from(raw: RawPage) -> Self {
        Self {
            status: raw.status,
            body: raw.body,
        }
    }
}

/// Why a request ended without content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("server error (HTTP {0})")]
    ServerError(u16),

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("undecodable body: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FailureReason {
    /// Returns true if another attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connection(_) | Self::ServerError(_) | Self::RateLimited
        )
    }
}

/// Outcome of one request after all its attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Succeeded(FetchedPage),
    Degraded(FailureReason),
    /// The run must stop; carries the proxy diagnostic
    FatalProxyFailure(String),
}

/// Result of one request, as returned by a completed batch
#[derive(Debug, Clone)]
pub struct PageResult {
    pub request: PageRequest,
    /// Attempts made, the first one included
    pub attempts: u32,
    /// Content, or the reason it is absent
    pub page: Result<FetchedPage, FailureReason>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.page.is_ok()
    }

    pub fn content(&self) -> Option<&str> {
        self.page.as_ref().ok().map(|page| page.body.as_str())
    }
}

/// Retry settings for transient failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per request, the first one included
    pub max_attempts: u32,
    /// Base delay in seconds
    pub backoff_factor: f64,
    /// Cap for a single delay
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_factor: config.backoff_factor,
            backoff_max: Duration::try_from_secs_f64(config.backoff_max_secs.max(0.0))
                .unwrap_or(Duration::MAX),
        }
    }

    /// Delay before retry number `retry` (1-based): `factor * 2^(retry - 1)`, capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(30) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs)
            .map(|delay| delay.min(self.backoff_max))
            .unwrap_or(self.backoff_max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// Runs batches of page requests against a shared transport
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    policy: RetryPolicy,
    concurrency: usize,
}

impl FetchScheduler {
    pub fn new(policy: RetryPolicy, concurrency: usize) -> Self {
        Self {
            policy,
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(RetryPolicy::from_config(config), config.concurrency)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetches every request of a batch, at most `concurrency` at a time
    ///
    /// Completes once every request has a result. Results are in completion
    /// order. The first proxy failure ends the batch with
    /// `HarvestError::ProxyFailure`; the other requests are dropped, so
    /// in-flight ones are cancelled and queued ones never start.
    ///
    /// # Arguments
    ///
    /// * `transport` - The run's shared transport
    /// * `requests` - The batch
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<PageResult>)` - One result per request, succeeded or degraded
    /// * `Err(HarvestError::ProxyFailure)` - The proxy failed; the run must stop
    pub async fn fetch_batch<T: Transport>(
        &self,
        transport: &T,
        requests: Vec<PageRequest>,
    ) -> Result<Vec<PageResult>, HarvestError> {
        let mut results = Vec::with_capacity(requests.len());

        let mut in_flight = stream::iter(requests)
            .map(|request| async move {
                let (outcome, attempts) = self.fetch_page(transport, &request).await;
                (request, outcome, attempts)
            })
            .buffer_unordered(self.concurrency);

        while let Some((request, outcome, attempts)) = in_flight.next().await {
            let page = match outcome {
                FetchOutcome::Succeeded(page) => Ok(page),
                FetchOutcome::Degraded(reason) => Err(reason),
                FetchOutcome::FatalProxyFailure(message) => {
                    tracing::debug!("Proxy failure on {}: {}", request.url, message);
                    return Err(HarvestError::ProxyFailure {
                        url: request.url.to_string(),
                        message,
                    });
                }
            };

            results.push(PageResult {
                request,
                attempts,
                page,
            });
        }

        Ok(results)
    }

    /// Fetches one page, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Succeeded |
    /// | HTTP 5xx, 429 | Retry with backoff, then Degraded |
    /// | Timeout, connection failure | Retry with backoff, then Degraded |
    /// | Other HTTP status | Immediate → Degraded |
    /// | Undecodable body | Immediate → Degraded |
    /// | Proxy failure | Immediate → FatalProxyFailure |
    ///
    /// # Returns
    ///
    /// The outcome and the number of attempts made
    pub async fn fetch_page<T: Transport>(
        &self,
        transport: &T,
        request: &PageRequest,
    ) -> (FetchOutcome, u32) {
        let mut tracker = FetchTracker::new();

        loop {
            tracker.advance(FetchState::Attempting);

            let reason = match transport.get(&request.url).await {
                Ok(raw) if (200..300).contains(&raw.status) => {
                    tracker.advance(FetchState::Succeeded);
                    tracing::trace!(
                        "Fetched {} ({} bytes, attempt {})",
                        request.url,
                        raw.body.len(),
                        tracker.attempts()
                    );
                    return (FetchOutcome::Succeeded(raw.into()), tracker.attempts());
                }
                Ok(raw) => classify_status(raw.status),
                Err(TransportError::Proxy(message)) => {
                    tracker.advance(FetchState::FatalAborted);
                    return (FetchOutcome::FatalProxyFailure(message), tracker.attempts());
                }
                Err(TransportError::Timeout) => FailureReason::Timeout,
                Err(TransportError::Connection(message)) => FailureReason::Connection(message),
                Err(TransportError::Decode(message)) => FailureReason::Decode(message),
                Err(TransportError::Request(message)) => FailureReason::Request(message),
            };

            if !reason.is_transient() || tracker.attempts() >= self.policy.max_attempts {
                tracker.advance(FetchState::Degraded);
                tracing::debug!(
                    "Giving up on {} after {} attempt(s): {}",
                    request.url,
                    tracker.attempts(),
                    reason
                );
                return (FetchOutcome::Degraded(reason), tracker.attempts());
            }

            let delay = self.policy.delay_for(tracker.attempts());
            tracker.advance(FetchState::Backoff);
            tracing::trace!(
                "Retrying {} in {:?} after: {}",
                request.url,
                delay,
                reason
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn classify_status(status: u16) -> FailureReason {
    match status {
        429 => FailureReason::RateLimited,
        500..=599 => FailureReason::ServerError(status),
        _ => FailureReason::HttpStatus(status),
    }
}
