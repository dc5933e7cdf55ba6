use crate::units::WorkUnit;
use serde::Serialize;

/// Marker written in place of a field that could not be extracted
pub const NOT_AVAILABLE: &str = "No info";

/// Column names of the output file, in order
pub const HEADER: [&str; 4] = ["call_sign", "name_original", "name_english", "birthdate"];

/// One output row: the fields of one detail page plus its work unit label
///
/// Every field is always present; missing values carry `NOT_AVAILABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub call_sign: String,
    pub name_original: String,
    pub name_english: String,
    /// `MM-DD` label of the work unit the record was found under
    pub birthdate: String,
}

impl Record {
    pub fn new(
        call_sign: impl Into<String>,
        name_original: impl Into<String>,
        name_english: impl Into<String>,
        unit: &WorkUnit,
    ) -> Self {
        Self {
            call_sign: call_sign.into(),
            name_original: name_original.into(),
            name_english: name_english.into(),
            birthdate: unit.label(),
        }
    }

    /// A record for a detail page whose content could not be fetched
    pub fn not_available(unit: &WorkUnit) -> Self {
        Self::new(NOT_AVAILABLE, NOT_AVAILABLE, NOT_AVAILABLE, unit)
    }

    /// Returns true if no extracted field carries a value
    pub fn is_empty(&self) -> bool {
        [&self.call_sign, &self.name_original, &self.name_english]
            .iter()
            .all(|field| field.as_str() == NOT_AVAILABLE)
    }
}
