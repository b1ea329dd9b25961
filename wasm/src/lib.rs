//! WebAssembly module for the poultry production ledger
//!
//! Provides client-side computation for:
//! - Laying rate, feed efficiency and bird balance
//! - Cage metrics snapshots and the analytics dashboard
//! - CSV templates and spreadsheet date parsing
//! - Vaccination schedule tracking
//!
//! Structured values cross the boundary as JSON strings in the same camelCase
//! shape the browser database stores.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::csv_text::{parse_csv, EntityKind};
use shared::insights;
use shared::lifecycle::{self, PerformanceLevel};
use shared::metrics;
use shared::models::{Cage, FeedLog, ProductionLog, Vaccination};
use shared::report::{AnalyticsFilter, AnalyticsReport};
use shared::units::{Eggs, FeedKg, Trays};

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn warn(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

fn from_json<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| {
        let message = format!("Invalid {} JSON: {}", what, e);
        warn(&message);
        JsValue::from_str(&message)
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&format!("Serialization failed: {}", e)))
}

fn parse_iso_date(value: &str) -> Result<NaiveDate, JsValue> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| JsValue::from_str("Expected a YYYY-MM-DD date"))
}

// ============================================================================
// Daily figures
// ============================================================================

/// Eggs as a percentage of bird-days
#[wasm_bindgen]
pub fn laying_percentage(eggs: f64, birds: f64, days: u32) -> f64 {
    metrics::laying_percentage(Eggs(eggs), birds, days)
}

/// Eggs per kilogram of feed
#[wasm_bindgen]
pub fn feed_efficiency(eggs: f64, feed_kg: f64) -> f64 {
    metrics::feed_efficiency(Eggs(eggs), FeedKg(feed_kg))
}

/// Birds left at the end of a day
#[wasm_bindgen]
pub fn closing_birds(opening_birds: u32, mortality: u32, birds_sold: u32) -> u32 {
    shared::models::closing_birds(opening_birds, mortality, birds_sold)
}

#[wasm_bindgen]
pub fn trays_to_eggs(trays: f64) -> f64 {
    Trays(trays).to_eggs().value()
}

/// Performance label for a mean laying rate
#[wasm_bindgen]
pub fn performance_level(laying_rate: f64) -> String {
    PerformanceLevel::from_laying_rate(laying_rate).to_string()
}

/// Trailing moving average of a JSON number array
#[wasm_bindgen]
pub fn moving_average(series_json: &str, window: usize) -> Result<String, JsValue> {
    let series: Vec<f64> = from_json("series", series_json)?;
    let averaged = metrics::moving_average(&series, window).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_json(&averaged)
}

// ============================================================================
// Cage and farm reports
// ============================================================================

/// Metrics snapshot for a cage
///
/// `cycle_start` is the cycle's ISO start date, used when logs carry no
/// flock age.
#[wasm_bindgen]
pub fn cage_metrics(
    cage_json: &str,
    logs_json: &str,
    feed_logs_json: &str,
    cycle_start: Option<String>,
) -> Result<String, JsValue> {
    let cage: Cage = from_json("cage", cage_json)?;
    let logs: Vec<ProductionLog> = from_json("production logs", logs_json)?;
    let feed_logs: Vec<FeedLog> = from_json("feed logs", feed_logs_json)?;
    let cycle_start = cycle_start.as_deref().map(parse_iso_date).transpose()?;

    to_json(&lifecycle::cage_metrics(&cage, cycle_start, &logs, &feed_logs))
}

/// Eggs and laying rate chart for a cage's most recent days
#[wasm_bindgen]
pub fn cage_production_chart(cage_json: &str, logs_json: &str) -> Result<String, JsValue> {
    let cage: Cage = from_json("cage", cage_json)?;
    let logs: Vec<ProductionLog> = from_json("production logs", logs_json)?;
    to_json(&lifecycle::cage_production_chart(&cage, &logs))
}

#[wasm_bindgen]
pub fn generate_insights(cages_json: &str, logs_json: &str, feed_logs_json: &str) -> Result<String, JsValue> {
    let cages: Vec<Cage> = from_json("cages", cages_json)?;
    let logs: Vec<ProductionLog> = from_json("production logs", logs_json)?;
    let feed_logs: Vec<FeedLog> = from_json("feed logs", feed_logs_json)?;
    to_json(&insights::generate_insights(&cages, &logs, &feed_logs))
}

/// Full analytics dashboard payload
#[wasm_bindgen]
pub fn analytics_report(
    filter_json: &str,
    cages_json: &str,
    logs_json: &str,
    feed_logs_json: &str,
) -> Result<String, JsValue> {
    let filter: AnalyticsFilter = from_json("filter", filter_json)?;
    let cages: Vec<Cage> = from_json("cages", cages_json)?;
    let logs: Vec<ProductionLog> = from_json("production logs", logs_json)?;
    let feed_logs: Vec<FeedLog> = from_json("feed logs", feed_logs_json)?;
    to_json(&AnalyticsReport::build(filter, &cages, &logs, &feed_logs))
}

/// Standard schedule marked against the recorded vaccinations
#[wasm_bindgen]
pub fn vaccination_schedule(vaccinations_json: &str) -> Result<String, JsValue> {
    let vaccinations: Vec<Vaccination> = from_json("vaccinations", vaccinations_json)?;
    to_json(&shared::models::vaccination_schedule(&vaccinations))
}

// ============================================================================
// CSV helpers
// ============================================================================

/// Import template for `production-logs`, `sales`, `expenses` or `feed-logs`
#[wasm_bindgen]
pub fn csv_template(entity: &str) -> Result<String, JsValue> {
    let kind: EntityKind = entity.parse().map_err(|e: shared::csv_text::CsvError| JsValue::from_str(&e.to_string()))?;
    Ok(kind.template())
}

/// Number of importable data rows in a CSV file, for the upload preview
#[wasm_bindgen]
pub fn csv_row_count(text: &str) -> Result<usize, JsValue> {
    parse_csv(text)
        .map(|rows| rows.len())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Normalise a spreadsheet date to `YYYY-MM-DD`
#[wasm_bindgen]
pub fn normalize_date(value: &str) -> Result<String, JsValue> {
    parse_flexible_date(value)
        .map(|date| date.to_string())
        .map_err(JsValue::from_str)
}
