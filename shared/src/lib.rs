//! Shared types, models and calculations for the poultry production ledger
//!
//! Everything here is pure: records go in, metrics, charts, insights and CSV
//! text come out. The engine crate adds storage and services on top, and the
//! wasm crate exposes the same calculations to the browser.

pub mod chart;
pub mod csv_text;
pub mod insights;
pub mod lifecycle;
pub mod metrics;
pub mod models;
pub mod report;
pub mod types;
pub mod units;
pub mod validation;

pub use chart::*;
pub use models::*;
pub use types::*;
pub use units::*;
pub use validation::*;
