//! Sales and expense models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::impl_record;
use super::Collection;
use crate::units::{Eggs, Trays};

/// A sale of eggs (by the crate) or of live birds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(default)]
    pub id: i64,
    pub cycle_id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub sale_type: SaleType,
    #[serde(default)]
    pub customer: String,
    /// Crates of eggs; one crate is one tray of 30 eggs
    #[serde(default)]
    pub crates: Decimal,
    #[serde(default)]
    pub price_per_crate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bird_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_bird: Option<Decimal>,
    #[serde(default, rename = "weight", skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl_record!(Sale, Collection::Sales);

/// What was sold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaleType {
    #[default]
    Egg,
    Bird,
}

impl std::fmt::Display for SaleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaleType::Egg => write!(f, "egg"),
            SaleType::Bird => write!(f, "bird"),
        }
    }
}

impl std::str::FromStr for SaleType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "egg" | "eggs" => Ok(SaleType::Egg),
            "bird" | "birds" => Ok(SaleType::Bird),
            _ => Err("Unknown sale type"),
        }
    }
}

impl Sale {
    /// Amount implied by the quantities on the sale
    pub fn computed_amount(&self) -> Decimal {
        match self.sale_type {
            SaleType::Egg => self.crates * self.price_per_crate,
            SaleType::Bird => {
                let quantity = Decimal::from(self.bird_quantity.unwrap_or(0));
                quantity * self.price_per_bird.unwrap_or(Decimal::ZERO)
            }
        }
    }

    /// Eggs sold, counting each crate as one tray
    pub fn eggs_sold(&self) -> Eggs {
        match self.sale_type {
            SaleType::Egg => Trays(self.crates.to_f64().unwrap_or(0.0)).to_eggs(),
            SaleType::Bird => Eggs::ZERO,
        }
    }
}

/// Sale form input
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaleInput {
    pub cycle_id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub sale_type: SaleType,
    #[validate(length(min = 1, max = 200))]
    pub customer: String,
    #[serde(default)]
    pub crates: Decimal,
    #[serde(default)]
    pub price_per_crate: Decimal,
    pub bird_quantity: Option<u32>,
    pub price_per_bird: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    #[validate(length(min = 1))]
    pub payment_method: String,
    #[serde(default)]
    pub notes: String,
}

/// An operating expense charged to a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default)]
    pub id: i64,
    pub cycle_id: i64,
    pub date: NaiveDate,
    #[serde(default = "default_expense_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl_record!(Expense, Collection::Expenses);

fn default_expense_category() -> String {
    "other".to_string()
}
