//! Production cycle models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::impl_record;
use super::Collection;

/// One production run of a flock, from placement to clearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: CycleStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(Cycle, Collection::Cycles);

/// Cycle lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    #[default]
    Active,
    Completed,
    Planned,
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleStatus::Active => write!(f, "active"),
            CycleStatus::Completed => write!(f, "completed"),
            CycleStatus::Planned => write!(f, "planned"),
        }
    }
}

impl Cycle {
    pub fn new(name: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            id: 0,
            name: name.into(),
            start_date,
            end_date: None,
            status: CycleStatus::Active,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Name shown in exports and headers; unnamed cycles fall back to their id
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Cycle {}", self.id)
        } else {
            self.name.clone()
        }
    }

    /// Flock age in days on the given date
    pub fn flock_age_on(&self, date: NaiveDate) -> u32 {
        flock_age_days(self.start_date, date)
    }
}

/// Whole days between the cycle start and a date, in either direction
pub fn flock_age_days(start_date: NaiveDate, date: NaiveDate) -> u32 {
    let days = (date - start_date).num_days().unsigned_abs();
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Input for creating a cycle
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CycleInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: CycleStatus,
    #[serde(default)]
    pub notes: String,
}

impl From<CycleInput> for Cycle {
    fn from(input: CycleInput) -> Self {
        Self {
            end_date: input.end_date,
            status: input.status,
            notes: input.notes,
            ..Cycle::new(input.name, input.start_date)
        }
    }
}
