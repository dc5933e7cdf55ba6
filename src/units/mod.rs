//! Work unit generation
//!
//! One work unit is one calendar day. The harvest window is fully derived from
//! a year (and optionally a first/last day), so it can be recomputed at any time.

mod work_unit;

pub use work_unit::{parse_day, work_units, work_units_between, WorkUnit};
