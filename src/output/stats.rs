//! Run statistics
//!
//! Counters gathered while harvesting, merged per work unit and printed at
//! the end of a successful run.

use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Work units fully processed
    pub work_units: u64,

    /// Listing pages fetched with content
    pub listing_pages_ok: u64,

    /// Listing pages that ended degraded (their unit produced no records)
    pub listing_pages_degraded: u64,

    /// Detail pages fetched with content
    pub detail_pages_ok: u64,

    /// Detail pages that ended degraded (written as "No info" rows)
    pub detail_pages_degraded: u64,

    /// Extra attempts spent on transient failures
    pub retries: u64,

    /// Data rows handed to the sink
    pub records_written: u64,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Adds the counters of `other` (elapsed time is not summed)
    pub fn merge(&mut self, other: &CrawlStatistics) {
        self.work_units += other.work_units;
        self.listing_pages_ok += other.listing_pages_ok;
        self.listing_pages_degraded += other.listing_pages_degraded;
        self.detail_pages_ok += other.detail_pages_ok;
        self.detail_pages_degraded += other.detail_pages_degraded;
        self.retries += other.retries;
        self.records_written += other.records_written;
    }

    pub fn total_pages(&self) -> u64 {
        self.listing_pages_ok
            + self.listing_pages_degraded
            + self.detail_pages_ok
            + self.detail_pages_degraded
    }

    pub fn degraded_pages(&self) -> u64 {
        self.listing_pages_degraded + self.detail_pages_degraded
    }

    /// Percentage of pages fetched with content
    pub fn success_rate(&self) -> f64 {
        let total = self.total_pages();
        if total == 0 {
            return 0.0;
        }
        ((total - self.degraded_pages()) as f64 / total as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Work units: {}", stats.work_units);
    println!("  Records written: {}", stats.records_written);
    println!("  Retries: {}", stats.retries);
    println!();

    println!("Pages:");
    println!(
        "  Listing: {} ok, {} degraded",
        stats.listing_pages_ok, stats.listing_pages_degraded
    );
    println!(
        "  Detail: {} ok, {} degraded",
        stats.detail_pages_ok, stats.detail_pages_degraded
    );
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched with content)",
        stats.success_rate(),
        stats.total_pages() - stats.degraded_pages(),
        stats.total_pages()
    );
}
