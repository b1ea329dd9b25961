//! Business logic services for the poultry ledger
//!
//! Every service is constructed with the storage it works against and is
//! cheap to clone.

pub mod analytics;
pub mod backup;
pub mod cage_detail;
pub mod csv_export;
pub mod csv_import;
pub mod production;
pub mod sales;
pub mod vaccination;

pub use analytics::AnalyticsService;
pub use backup::BackupService;
pub use cage_detail::CageDetailService;
pub use csv_export::CsvExportService;
pub use csv_import::CsvImportService;
pub use production::ProductionService;
pub use sales::SalesService;
pub use vaccination::VaccinationService;

use chrono::NaiveDate;

/// Download name `<stem>-<date>.<ext>`, with path separators in the stem replaced
pub fn export_file_name(stem: &str, date: NaiveDate, ext: &str) -> String {
    let stem = stem.replace(['/', '\\'], "-");
    format!("{}-{}.{}", stem, date.format("%Y-%m-%d"), ext)
}
