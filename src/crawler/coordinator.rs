//! Harvest coordinator - main orchestration logic
//!
//! For every work unit: fetch its listing page, extract the detail links,
//! fetch every detail page as one bounded batch, extract the records, and
//! hand them to the sink. Units may overlap up to `unit-concurrency`, but the
//! sink sees them one at a time in calendar order.

use crate::config::Config;
use crate::crawler::extractor::Extractor;
use crate::crawler::scheduler::{FetchScheduler, PageRequest, PageRole};
use crate::crawler::transport::Transport;
use crate::output::{CrawlStatistics, Record, RecordSink};
use crate::units::WorkUnit;
use crate::HarvestError;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::time::Instant;
use url::Url;

/// Everything harvested for one work unit
#[derive(Debug)]
struct UnitHarvest {
    unit: WorkUnit,
    records: Vec<Record>,
    stats: CrawlStatistics,
}

/// Main harvest coordinator structure
pub struct Coordinator<T: Transport, S: RecordSink> {
    transport: T,
    sink: S,
    extractor: Extractor,
    scheduler: FetchScheduler,
    listing_base: Url,
    window: Vec<WorkUnit>,
    unit_concurrency: usize,
}

impl<T: Transport, S: RecordSink> Coordinator<T, S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `transport` - The run's transport, already bound to its proxy
    /// * `sink` - Destination of the records
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Invalid base URL, selector, or window
    pub fn new(config: &Config, transport: T, sink: S) -> Result<Self, HarvestError> {
        let root = Url::parse(&config.crawl.base_url)?;
        let listing_base = root.join(&config.crawl.listing_path)?;
        let extractor = Extractor::new(root, &config.selectors)?;

        Ok(Self {
            transport,
            sink,
            extractor,
            scheduler: FetchScheduler::from_config(&config.fetch),
            listing_base,
            window: config.window()?,
            unit_concurrency: config.crawl.unit_concurrency.max(1),
        })
    }

    /// The configured work units, in calendar order
    pub fn window(&self) -> &[WorkUnit] {
        &self.window
    }

    /// URL of the listing page for `unit`
    pub fn listing_url(&self, unit: &WorkUnit) -> Result<Url, HarvestError> {
        Ok(self.listing_base.join(&unit.label())?)
    }

    /// The run's transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gives the sink back, e.g. to inspect an in-memory output
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Harvests the configured window
    pub async fn run(&mut self) -> Result<CrawlStatistics, HarvestError> {
        let units = self.window.clone();
        self.run_units(&units).await
    }

    /// Harvests `units`, writing them to the sink in the given order
    ///
    /// A proxy failure stops the run as soon as any unit hits it: in-flight
    /// requests of every unit are cancelled, no further batch starts, and the
    /// sink is left with the units written so far.
    pub async fn run_units(&mut self, units: &[WorkUnit]) -> Result<CrawlStatistics, HarvestError> {
        tracing::info!(
            "Harvesting {} work unit(s), {} at a time, batch concurrency {}",
            units.len(),
            self.unit_concurrency,
            self.scheduler.concurrency()
        );

        let start_time = Instant::now();
        let mut stats = CrawlStatistics::default();

        let transport = &self.transport;
        let scheduler = &self.scheduler;
        let extractor = &self.extractor;
        let listing_base = &self.listing_base;

        // Units complete in any order; `ready` holds them until every earlier one is written
        let mut harvests = stream::iter(units.iter().copied().enumerate())
            .map(|(position, unit)| async move {
                let harvest =
                    harvest_unit(transport, scheduler, extractor, listing_base, unit).await?;
                Ok::<_, HarvestError>((position, harvest))
            })
            .buffer_unordered(self.unit_concurrency);

        let mut ready = BTreeMap::new();
        let mut next_position = 0;

        while let Some(finished) = harvests.next().await {
            let (position, harvest) = finished?;
            ready.insert(position, harvest);

            while let Some(harvest) = ready.remove(&next_position) {
                self.sink.begin_work_unit(&harvest.unit)?;
                self.sink.append_records(&harvest.unit, &harvest.records)?;
                stats.merge(&harvest.stats);
                next_position += 1;

                tracing::info!(
                    "{}: {} record(s) ({} units done, {} records total)",
                    harvest.unit,
                    harvest.records.len(),
                    stats.work_units,
                    stats.records_written
                );
            }
        }

        self.sink.end_run()?;
        stats.elapsed = start_time.elapsed();

        tracing::info!(
            "Harvest completed: {} records from {} units in {:?}",
            stats.records_written,
            stats.work_units,
            stats.elapsed
        );

        Ok(stats)
    }
}

/// Fetches and extracts everything for one work unit
async fn harvest_unit<T: Transport>(
    transport: &T,
    scheduler: &FetchScheduler,
    extractor: &Extractor,
    listing_base: &Url,
    unit: WorkUnit,
) -> Result<UnitHarvest, HarvestError> {
    let mut stats = CrawlStatistics {
        work_units: 1,
        ..CrawlStatistics::default()
    };

    let listing = PageRequest::new(0, listing_base.join(&unit.label())?, unit, PageRole::Listing);
    let listing_results = scheduler.fetch_batch(transport, vec![listing]).await?;

    let mut references = Vec::new();
    for result in &listing_results {
        stats.retries += u64::from(result.attempts.saturating_sub(1));
        match &result.page {
            Ok(page) => {
                stats.listing_pages_ok += 1;
                references = extractor.extract_listing(&page.body, unit);
            }
            Err(reason) => {
                stats.listing_pages_degraded += 1;
                tracing::warn!(
                    "Listing for {} unavailable ({}), no records for this day",
                    unit,
                    reason
                );
            }
        }
    }

    tracing::debug!("{}: {} detail link(s)", unit, references.len());

    let requests = references
        .into_iter()
        .enumerate()
        .map(|(id, reference)| PageRequest::new(id, reference.url, reference.unit, PageRole::Detail))
        .collect();

    let mut results = scheduler.fetch_batch(transport, requests).await?;
    results.sort_by_key(|result| result.request.id);

    let records: Vec<Record> = results
        .iter()
        .map(|result| {
            stats.retries += u64::from(result.attempts.saturating_sub(1));
            match &result.page {
                Ok(page) => {
                    stats.detail_pages_ok += 1;
                    extractor.extract_detail(&page.body, unit)
                }
                Err(reason) => {
                    stats.detail_pages_degraded += 1;
                    tracing::debug!("Detail {} degraded: {}", result.request.url, reason);
                    Record::not_available(&unit)
                }
            }
        })
        .collect();

    stats.records_written = records.len() as u64;

    Ok(UnitHarvest {
        unit,
        records,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::transport::{RawPage, TransportError};
    use crate::output::CsvSink;

    /// Answers every URL with the same page
    struct StaticTransport {
        body: &'static str,
    }

    impl Transport for StaticTransport {
        async fn get(&self, _url: &Url) -> Result<RawPage, TransportError> {
            Ok(RawPage {
                status: 200,
                body: self.body.to_string(),
            })
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.crawl.year = Some(2024);
        config.crawl.first_day = Some("01-01".to_string());
        config.crawl.last_day = Some("01-03".to_string());
        config.crawl.base_url = "http://callbook.test".to_string();
        config
    }

    #[test]
    fn test_listing_url() {
        let coordinator = Coordinator::new(
            &test_config(),
            StaticTransport { body: "" },
            CsvSink::new(Vec::new()).unwrap(),
        )
        .unwrap();

        let unit = coordinator.window()[1];
        assert_eq!(
            coordinator.listing_url(&unit).unwrap().as_str(),
            "http://callbook.test/callbook/birthday/01-02"
        );
        assert_eq!(coordinator.window().len(), 3);
    }

    #[tokio::test]
    async fn test_listing_without_links_writes_header_only() {
        let mut coordinator = Coordinator::new(
            &test_config(),
            StaticTransport {
                body: "<html><body>nobody today</body></html>",
            },
            CsvSink::new(Vec::new()).unwrap(),
        )
        .unwrap();

        let stats = coordinator.run().await.unwrap();
        assert_eq!(stats.work_units, 3);
        assert_eq!(stats.listing_pages_ok, 3);
        assert_eq!(stats.records_written, 0);

        let bytes = coordinator.into_sink().into_inner().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "call_sign,name_original,name_english,birthdate\r\n"
        );
    }
}
