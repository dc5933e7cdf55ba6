//! CSV record sink
//!
//! The file is opened (and truncated) exactly once per run; the header row is
//! written at that moment and every later write appends.

use crate::output::traits::{RecordSink, SinkError, SinkResult};
use crate::output::{Record, HEADER};
use crate::units::WorkUnit;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes records as comma-delimited rows quoted with `'`
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    current: Option<WorkUnit>,
    units_written: usize,
    rows_written: u64,
    closed: bool,
}

impl CsvSink<File> {
    /// Creates (or truncates) the output file and writes the header
    ///
    /// # Example
    ///
    /// ```no_run
    /// use callbook_harvest::output::CsvSink;
    ///
    /// let sink = CsvSink::create("./amateurs").unwrap();
    /// assert_eq!(sink.rows_written(), 0);
    /// ```
    pub fn create<P: AsRef<Path>>(path: P) -> SinkResult<Self> {
        let file = File::create(path)?;
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps `inner` and writes the header row
    pub fn new(inner: W) -> SinkResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(b',')
            .quote(b'\'')
            .terminator(csv::Terminator::CRLF)
            .from_writer(inner);

        writer.write_record(HEADER)?;
        writer.flush()?;

        Ok(Self {
            writer,
            current: None,
            units_written: 0,
            rows_written: 0,
            closed: false,
        })
    }

    /// Number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Number of work units begun so far
    pub fn units_written(&self) -> usize {
        self.units_written
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> SinkResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }

    fn ensure_open(&self) -> SinkResult<()> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        Ok(())
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn begin_work_unit(&mut self, unit: &WorkUnit) -> SinkResult<()> {
        self.ensure_open()?;
        self.current = Some(*unit);
        self.units_written += 1;
        Ok(())
    }

    fn append_records(&mut self, unit: &WorkUnit, records: &[Record]) -> SinkResult<()> {
        self.ensure_open()?;

        match self.current {
            Some(current) if current == *unit => {}
            Some(current) => {
                return Err(SinkError::UnitMismatch {
                    expected: current.label(),
                    got: unit.label(),
                })
            }
            None => return Err(SinkError::NoUnitBegun(unit.label())),
        }

        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        self.rows_written += records.len() as u64;

        tracing::debug!("Wrote {} rows for {}", records.len(), unit);
        Ok(())
    }

    fn end_run(&mut self) -> SinkResult<()> {
        self.ensure_open()?;
        self.writer.flush()?;
        self.closed = true;
        self.current = None;
        Ok(())
    }
}
