//! Crawler module for page fetching and processing
//!
//! This module contains the core harvesting logic, including:
//! - The HTTP transport bound to the run's proxy
//! - The fetch scheduler with bounded fan-out and retry logic
//! - Listing and detail page extraction
//! - Overall harvest coordination

mod coordinator;
mod extractor;
mod scheduler;
mod transport;

pub use coordinator::Coordinator;
pub use extractor::{DetailReference, Extractor};
pub use scheduler::{
    FailureReason, FetchOutcome, FetchScheduler, FetchedPage, PageRequest, PageResult, PageRole,
    RetryPolicy,
};
pub use transport::{HttpTransport, RawPage, Transport, TransportError};

use crate::config::Config;
use crate::output::{CrawlStatistics, CsvSink};
use crate::proxy::ProxyBinding;
use crate::HarvestError;

/// Runs a complete harvest over the configured window
///
/// This is the main entry point for a run. It will:
/// 1. Build the HTTP transport around the already-acquired proxy binding
/// 2. Create the output file and write its header
/// 3. Harvest every work unit in calendar order
/// 4. Close the output
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `binding` - The run's proxy binding
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Harvest completed
/// * `Err(HarvestError)` - Harvest failed (proxy failure, output failure, ...)
pub async fn harvest(config: &Config, binding: ProxyBinding) -> Result<CrawlStatistics, HarvestError> {
    let transport = HttpTransport::new(&config.fetch, binding)?;
    let sink = CsvSink::create(&config.output.path)?;

    let mut coordinator = Coordinator::new(config, transport, sink)?;
    coordinator.run().await
}
