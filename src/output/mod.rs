//! Output module for harvested records
//!
//! This module handles:
//! - The record shape and the "not available" marker
//! - The `RecordSink` contract and its CSV implementation
//! - Run statistics

mod csv_sink;
mod record;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use record::{Record, HEADER, NOT_AVAILABLE};
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{RecordSink, SinkError, SinkResult};
