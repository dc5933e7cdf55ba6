use crate::{ConfigError, HarvestError};
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// One calendar day of the harvest window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkUnit {
    date: NaiveDate,
}

impl WorkUnit {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    /// Renders the `MM-DD` label used both in listing URLs and in output rows
    pub fn label(&self) -> String {
        format!("{:02}-{:02}", self.date.month(), self.date.day())
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Generates every day of `year`, January 1 through December 31 inclusive
///
/// # Example
///
/// ```
/// use callbook_harvest::units::work_units;
///
/// let units = work_units(2024).unwrap();
/// assert_eq!(units.len(), 366);
/// assert_eq!(units[0].label(), "01-01");
/// ```
pub fn work_units(year: i32) -> Result<Vec<WorkUnit>, HarvestError> {
    let first = calendar_date(year, 1, 1)?;
    let last = calendar_date(year, 12, 31)?;
    work_units_between(first, last)
}

/// Generates every day from `first` to `last` inclusive, in calendar order
pub fn work_units_between(first: NaiveDate, last: NaiveDate) -> Result<Vec<WorkUnit>, HarvestError> {
    if first > last {
        return Err(HarvestError::Calendar(format!(
            "window start {} is after window end {}",
            first, last
        )));
    }

    let mut units = Vec::new();
    let mut current = first;
    loop {
        units.push(WorkUnit::new(current));
        if current == last {
            break;
        }
        current = current
            .succ_opt()
            .ok_or_else(|| HarvestError::Calendar(format!("no day after {}", current)))?;
    }

    Ok(units)
}

/// Parses an `MM-DD` day label into a date of `year`
pub fn parse_day(year: i32, label: &str) -> Result<NaiveDate, ConfigError> {
    let (month, day) = label
        .split_once('-')
        .ok_or_else(|| ConfigError::InvalidDay(label.to_string()))?;

    let month: u32 = month
        .parse()
        .map_err(|_| ConfigError::InvalidDay(label.to_string()))?;
    let day: u32 = day
        .parse()
        .map_err(|_| ConfigError::InvalidDay(label.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ConfigError::InvalidDay(format!("{} does not exist in {}", label, year)))
}

fn calendar_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, HarvestError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| HarvestError::Calendar(format!("year {} is out of range", year)))
}
