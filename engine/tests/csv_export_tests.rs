//! CSV and JSON export tests
//!
//! Covers:
//! - Quoting of notes with commas, quotes and line breaks
//! - Reference columns written as names
//! - Export then import into an empty store

use std::sync::Arc;

use chrono::NaiveDate;

use poultry_ledger::services::{CsvExportService, CsvImportService, ProductionService};
use poultry_ledger::storage::{MemoryStore, Repository, Store};
use shared::csv_text::{parse_csv, EntityKind};
use shared::models::{Cage, Cycle, DailyProductionInput, ProductionLog};
use shared::units::Eggs;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn seeded_store(notes: &str) -> Arc<dyn Store> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let repo = Repository::new(store.clone());

    let mut cycle = Cycle::new("Cycle 1", date("2025-02-18"));
    repo.add(&mut cycle).await.unwrap();
    let mut cage = Cage::new(cycle.id, "Cage A1", 500, 100);
    repo.add(&mut cage).await.unwrap();

    for (day, eggs) in [("2025-07-20", 85.0), ("2025-07-21", 80.0)] {
        let mut log = ProductionLog {
            flock_age: Some(150),
            opening_birds: 100,
            mortality: 1,
            eggs_produced: Some(Eggs(eggs)),
            notes: notes.to_string(),
            ..ProductionLog::new(cage.id, cycle.id, date(day))
        };
        log.recompute_closing();
        repo.add(&mut log).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_production_export_layout() {
    let store = seeded_store("Normal day").await;
    let file = CsvExportService::new(store)
        .export_csv(EntityKind::ProductionLogs, None, date("2025-07-22"))
        .await
        .unwrap();

    assert_eq!(file.file_name, "production-logs-export-2025-07-22.csv");
    let lines: Vec<&str> = file.content.lines().collect();
    assert_eq!(lines[0], EntityKind::ProductionLogs.headers().join(","));
    assert_eq!(lines[1], "2025-07-20,Cycle 1,Cage A1,150,100,1,0,85,99,85.0,Normal day");
    assert_eq!(lines.len(), 3);
    assert!(!file.content.ends_with('\n'));
}

#[tokio::test]
async fn test_notes_are_quoted() {
    let store = seeded_store("Wet litter, \"check\" drinkers").await;
    let file = CsvExportService::new(store)
        .export_csv(EntityKind::ProductionLogs, None, date("2025-07-22"))
        .await
        .unwrap();

    assert!(file.content.contains(",\"Wet litter, \"\"check\"\" drinkers\""));
    let rows = parse_csv(&file.content).unwrap();
    assert_eq!(rows[0].text(&["Notes"]), "Wet litter, \"check\" drinkers");
}

#[tokio::test]
async fn test_multiline_notes_survive() {
    let store = seeded_store("line one\nline two").await;
    let file = CsvExportService::new(store)
        .export_csv(EntityKind::ProductionLogs, None, date("2025-07-22"))
        .await
        .unwrap();

    let rows = parse_csv(&file.content).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].text(&["Notes"]), "line one\nline two");
}

#[tokio::test]
async fn test_empty_export_is_empty_text() {
    let store = seeded_store("").await;
    let file = CsvExportService::new(store)
        .export_csv(EntityKind::Sales, None, date("2025-07-22"))
        .await
        .unwrap();
    assert_eq!(file.content, "");
    assert_eq!(file.file_name, "sales-export-2025-07-22.csv");
}

#[tokio::test]
async fn test_cycle_filter() {
    let store = seeded_store("").await;
    let file = CsvExportService::new(store)
        .export_csv(EntityKind::ProductionLogs, Some(99), date("2025-07-22"))
        .await
        .unwrap();
    assert_eq!(file.content, "");
}

#[tokio::test]
async fn test_json_export() {
    let store = seeded_store("").await;
    let file = CsvExportService::new(store)
        .export_json(EntityKind::ProductionLogs, None, date("2025-07-22"))
        .await
        .unwrap();

    assert_eq!(file.file_name, "production-logs-export-2025-07-22.json");
    let records: Vec<serde_json::Value> = serde_json::from_str(&file.content).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["closingBirds"], 99);
}

#[tokio::test]
async fn test_export_reimports_into_empty_store() {
    let store = seeded_store("Normal day").await;
    let file = CsvExportService::new(store)
        .export_csv(EntityKind::ProductionLogs, None, date("2025-07-22"))
        .await
        .unwrap();

    let fresh: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let results = CsvImportService::new(fresh.clone())
        .import_production_logs(&file.content)
        .await
        .unwrap();

    assert!(results.is_clean());
    assert_eq!(results.success, 2);
    assert_eq!(results.new_cycles, 1);
    assert_eq!(results.new_cages, 1);

    let logs: Vec<ProductionLog> = Repository::new(fresh).all().await.unwrap();
    assert_eq!(logs[1].eggs(), Eggs(80.0));
    assert_eq!(logs[1].closing_birds, 99);
}

#[tokio::test]
async fn test_fractional_trays_keep_every_egg() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let repo = Repository::new(store.clone());
    let mut cycle = Cycle::new("Cycle 1", date("2025-02-18"));
    repo.add(&mut cycle).await.unwrap();
    let mut cage = Cage::new(cycle.id, "Cage A1", 500, 100);
    repo.add(&mut cage).await.unwrap();

    let input = DailyProductionInput {
        cage_id: cage.id,
        date: date("2025-07-21"),
        flock_age: None,
        opening_birds: 100,
        mortality: 0,
        birds_sold: 0,
        eggs_trays: 4.1,
        current_feed: 0.0,
        avg_egg_weight: None,
        notes: String::new(),
    };
    ProductionService::new(store.clone()).save_daily_log(input).await.unwrap();

    let file = CsvExportService::new(store)
        .export_csv(EntityKind::ProductionLogs, None, date("2025-07-22"))
        .await
        .unwrap();
    let rows = parse_csv(&file.content).unwrap();
    assert_eq!(rows[0].text(&["Eggs_Produced"]), "123");

    let fresh: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let results = CsvImportService::new(fresh.clone())
        .import_production_logs(&file.content)
        .await
        .unwrap();
    assert!(results.is_clean());

    let logs: Vec<ProductionLog> = Repository::new(fresh).all().await.unwrap();
    assert_eq!(logs[0].eggs(), Eggs(123.0));
}

#[test]
fn test_templates() {
    let file = CsvExportService::template(EntityKind::Sales);
    assert_eq!(file.file_name, "sales-template.csv");
    assert_eq!(file.content.lines().count(), 2);
}
