//! Daily production and feed log models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::impl_record;
use super::Collection;
use crate::units::{EggOutput, Eggs, FeedKg, Grams, Trays};

/// One day's production entry for a cage; unique per `(cage_id, date)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionLog {
    #[serde(default)]
    pub id: i64,
    pub cage_id: i64,
    pub cycle_id: i64,
    pub date: NaiveDate,
    /// Days since the cycle start, as recorded on the day
    #[serde(default, alias = "flockAgeDays")]
    pub flock_age: Option<u32>,
    #[serde(default)]
    pub opening_birds: u32,
    #[serde(default)]
    pub mortality: u32,
    #[serde(default)]
    pub birds_sold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eggs_trays: Option<Trays>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eggs_produced: Option<Eggs>,
    #[serde(default)]
    pub closing_birds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_feed: Option<FeedKg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_egg_weight: Option<Grams>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(ProductionLog, Collection::ProductionLogs);

/// Birds left at the end of the day, never below zero
pub fn closing_birds(opening_birds: u32, mortality: u32, birds_sold: u32) -> u32 {
    opening_birds
        .saturating_sub(mortality)
        .saturating_sub(birds_sold)
}

impl ProductionLog {
    pub fn new(cage_id: i64, cycle_id: i64, date: NaiveDate) -> Self {
        Self {
            id: 0,
            cage_id,
            cycle_id,
            date,
            flock_age: None,
            opening_birds: 0,
            mortality: 0,
            birds_sold: 0,
            eggs_trays: None,
            eggs_produced: None,
            closing_birds: 0,
            current_feed: None,
            avg_egg_weight: None,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn egg_output(&self) -> EggOutput {
        EggOutput::from_parts(self.eggs_trays, self.eggs_produced)
    }

    /// Normalised egg count for the day
    pub fn eggs(&self) -> Eggs {
        self.egg_output().eggs()
    }

    pub fn trays(&self) -> Trays {
        self.egg_output().trays()
    }

    pub fn feed(&self) -> FeedKg {
        self.current_feed.unwrap_or_default()
    }

    /// Recompute `closing_birds` from the day's movements
    pub fn recompute_closing(&mut self) {
        self.closing_birds = closing_birds(self.opening_birds, self.mortality, self.birds_sold);
    }
}

/// Feed consumed on a date, recorded against a cage or a whole cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedLog {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cage_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<i64>,
    pub date: NaiveDate,
    #[serde(default)]
    pub amount: FeedKg,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(FeedLog, Collection::FeedLogs);

impl FeedLog {
    pub fn new(date: NaiveDate, amount: FeedKg) -> Self {
        Self {
            id: 0,
            cage_id: None,
            cycle_id: None,
            date,
            amount,
            cost: Decimal::ZERO,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Daily production form input
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DailyProductionInput {
    pub cage_id: i64,
    pub date: NaiveDate,
    pub flock_age: Option<u32>,
    #[validate(range(max = 1000000))]
    pub opening_birds: u32,
    #[serde(default)]
    pub mortality: u32,
    #[serde(default)]
    pub birds_sold: u32,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub eggs_trays: f64,
    #[validate(range(min = 0.0, max = 100000.0))]
    #[serde(default)]
    pub current_feed: f64,
    pub avg_egg_weight: Option<f64>,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: String,
}
