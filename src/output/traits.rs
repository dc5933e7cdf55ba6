//! Record sink trait and error types
//!
//! A sink owns the output medium for the whole run. Records of every work unit
//! processed so far must remain in the output; a sink never truncates or
//! replaces content written for an earlier unit.

use crate::output::Record;
use crate::units::WorkUnit;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Records for {got} appended while {expected} is open")]
    UnitMismatch { expected: String, got: String },

    #[error("Records for {0} appended before the unit was begun")]
    NoUnitBegun(String),

    #[error("Sink already closed")]
    Closed,
}

/// Result type for output operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination of harvested records
///
/// Calls arrive from a single writer: `begin_work_unit`, then one or more
/// `append_records` for that unit, repeated per unit, then `end_run`.
pub trait RecordSink {
    /// Opens the section of output for `unit`
    fn begin_work_unit(&mut self, unit: &WorkUnit) -> SinkResult<()>;

    /// Appends the records of the currently open unit and makes them durable
    fn append_records(&mut self, unit: &WorkUnit, records: &[Record]) -> SinkResult<()>;

    /// Flushes and closes the output; no further calls are accepted
    fn end_run(&mut self) -> SinkResult<()>;
}
