//! Common types used across the workspace

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date range presets offered on the dashboards
pub const DATE_RANGE_PRESETS: [u32; 4] = [7, 30, 90, 365];

/// How far back a query looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateRange {
    LastDays(u32),
    All,
}

impl Default for DateRange {
    fn default() -> Self {
        DateRange::LastDays(30)
    }
}

impl DateRange {
    /// Earliest date inside the range, counted back from `as_of`
    pub fn cutoff(&self, as_of: NaiveDate) -> Option<NaiveDate> {
        match self {
            DateRange::LastDays(days) => Some(as_of - Duration::days(i64::from(*days))),
            DateRange::All => None,
        }
    }

    pub fn contains(&self, date: NaiveDate, as_of: NaiveDate) -> bool {
        self.cutoff(as_of).map_or(true, |cutoff| date >= cutoff)
    }
}

/// What an import does when a row names a cycle or cage that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingReferencePolicy {
    /// Create the missing record and keep going
    #[default]
    AutoCreate,
    /// Fail the row and list what does exist
    Reject,
}

impl std::str::FromStr for MissingReferencePolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "auto_create" | "create" => Ok(MissingReferencePolicy::AutoCreate),
            "reject" => Ok(MissingReferencePolicy::Reject),
            _ => Err("Unknown missing reference policy"),
        }
    }
}

/// A row that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// Outcome of one import batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportResults {
    /// Rows stored, including those that replaced an existing record
    pub success: usize,
    pub errors: Vec<RowError>,
    pub new_cycles: usize,
    pub new_cages: usize,
    /// Rows that replaced an existing record for the same cage and date
    pub updated: usize,
}

impl ImportResults {
    pub fn record_error(&mut self, row: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn rows_seen(&self) -> usize {
        self.success + self.errors.len()
    }
}
