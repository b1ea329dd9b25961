//! Validation utilities for poultry records
//!
//! Field-level checks that the derive-based `Validate` impls cannot express,
//! plus the lenient date parser used for spreadsheet input.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{SaleInput, SaleType};

// ============================================================================
// Dates
// ============================================================================

/// Accepted spreadsheet date layouts, tried in order
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Parse a date as typed into a spreadsheet
///
/// A trailing time part (`2025-07-21T08:00:00Z`) is ignored.
pub fn parse_flexible_date(value: &str) -> Result<NaiveDate, &'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Date is required");
    }
    let date_part = value.split(['T', ' ']).next().unwrap_or(value);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .ok_or("Invalid date, expected YYYY-MM-DD")
}

// ============================================================================
// References
// ============================================================================

/// Validate a cycle or cage reference taken from an import row
pub fn validate_reference(reference: &str) -> Result<(), &'static str> {
    if reference.trim().is_empty() {
        return Err("Missing reference");
    }
    Ok(())
}

// ============================================================================
// Sales
// ============================================================================

/// Validate egg sale quantities (crates may be fractional, at least one)
pub fn validate_egg_sale(crates: Decimal, price_per_crate: Decimal) -> Result<(), &'static str> {
    if crates < Decimal::ONE {
        return Err("An egg sale needs at least one crate");
    }
    if price_per_crate < Decimal::ZERO {
        return Err("Price per crate cannot be negative");
    }
    Ok(())
}

/// Validate live bird sale quantities
pub fn validate_bird_sale(quantity: Option<u32>, price_per_bird: Option<Decimal>) -> Result<(), &'static str> {
    match quantity {
        Some(q) if q >= 1 => {}
        _ => return Err("A bird sale needs at least one bird"),
    }
    if price_per_bird.unwrap_or(Decimal::ZERO) < Decimal::ZERO {
        return Err("Price per bird cannot be negative");
    }
    Ok(())
}

/// Validate a sale form by its type
pub fn validate_sale_quantities(input: &SaleInput) -> Result<(), &'static str> {
    match input.sale_type {
        SaleType::Egg => validate_egg_sale(input.crates, input.price_per_crate),
        SaleType::Bird => validate_bird_sale(input.bird_quantity, input.price_per_bird),
    }
}

// ============================================================================
// Flock
// ============================================================================

/// Average egg weight in grams, when recorded, must be plausible for a hen egg
pub fn validate_egg_weight(grams: f64) -> Result<(), &'static str> {
    if !(0.0..=120.0).contains(&grams) {
        return Err("Average egg weight must be between 0 and 120 g");
    }
    Ok(())
}
