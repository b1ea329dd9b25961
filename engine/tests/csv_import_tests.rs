//! CSV import reconciliation tests
//!
//! Covers:
//! - Property 1: Closing birds are recomputed and never negative
//! - Property 2: Re-importing the same production file never duplicates logs
//! - Missing cycle and cage references under both policies
//! - Row-level error isolation and row numbering

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use poultry_ledger::services::csv_import::{CsvImportService, AUTO_CREATED_NOTE};
use poultry_ledger::storage::{MemoryStore, Repository, Store};
use shared::csv_text::EntityKind;
use shared::models::{Cage, Cycle, Expense, FeedLog, ProductionLog, Sale, SaleType};
use shared::types::MissingReferencePolicy;
use shared::units::{Eggs, FeedKg};

const PRODUCTION_HEADER: &str = "Date,Cycle,Cage,Flock_Age_Days,Opening_Birds,Mortality,Birds_Sold,Eggs_Produced,Closing_Birds,Production_Percentage,Notes";

fn store() -> Arc<dyn Store> {
    Arc::new(MemoryStore::new())
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn production_csv(rows: &[&str]) -> String {
    let mut lines = vec![PRODUCTION_HEADER];
    lines.extend_from_slice(rows);
    lines.join("\n")
}

async fn seed_cycle(store: &Arc<dyn Store>, name: &str) -> Cycle {
    let mut cycle = Cycle::new(name, date("2025-02-18"));
    Repository::new(store.clone()).add(&mut cycle).await.unwrap();
    cycle
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property 1: Closing birds are recomputed from the row's movements
    ///
    /// Whatever the file says in Closing_Birds, the stored value is
    /// opening - mortality - sold, clamped at zero.
    #[test]
    fn prop_closing_birds_recomputed(
        opening in 0u32..2000,
        mortality in 0u32..100,
        sold in 0u32..2500,
        stated in 0u32..5000,
    ) {
        let store = store();
        let text = production_csv(&[&format!(
            "2025-07-21,Cycle 1,Cage A1,150,{},{},{},85,{},0,",
            opening, mortality, sold, stated
        )]);

        let results = tokio_test::block_on(CsvImportService::new(store.clone()).import_production_logs(&text)).unwrap();
        prop_assert_eq!(results.success, 1);

        let logs: Vec<ProductionLog> = tokio_test::block_on(Repository::new(store).all()).unwrap();
        let expected = opening.saturating_sub(mortality).saturating_sub(sold);
        prop_assert_eq!(logs[0].closing_birds, expected);
    }

    /// Property 2: Importing the same file twice keeps one log per cage and date
    #[test]
    fn prop_reimport_is_idempotent(days in 1usize..10) {
        let store = store();
        let rows: Vec<String> = (0..days)
            .map(|day| format!("2025-07-{:02},Cycle 1,Cage A1,,100,0,0,80,100,80.0,", day + 1))
            .collect();
        let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let text = production_csv(&row_refs);
        let service = CsvImportService::new(store.clone());

        let first = tokio_test::block_on(service.import_production_logs(&text)).unwrap();
        let second = tokio_test::block_on(service.import_production_logs(&text)).unwrap();

        prop_assert_eq!(first.success, days);
        prop_assert_eq!(first.updated, 0);
        prop_assert_eq!(second.success, days);
        prop_assert_eq!(second.updated, days);
        prop_assert_eq!(second.new_cycles, 0);
        prop_assert_eq!(second.new_cages, 0);

        let logs: Vec<ProductionLog> = tokio_test::block_on(Repository::new(store).all()).unwrap();
        prop_assert_eq!(logs.len(), days);
    }
}

// ============================================================================
// Production logs
// ============================================================================

#[tokio::test]
async fn test_auto_create_makes_one_cycle_and_cage() {
    let store = store();
    let text = production_csv(&[
        "2025-07-20,Cycle 1,Cage A1,149,100,1,0,85,99,85.0,",
        "2025-07-21,Cycle 1,Cage A1,150,99,2,0,80,97,80.8,",
        "2025-07-21,Cycle 1,Cage A2,150,120,0,0,100,120,83.3,",
    ]);

    let results = CsvImportService::new(store.clone())
        .import_production_logs(&text)
        .await
        .unwrap();

    assert!(results.is_clean());
    assert_eq!(results.success, 3);
    assert_eq!(results.new_cycles, 1);
    assert_eq!(results.new_cages, 2);

    let repo = Repository::new(store);
    let cycles: Vec<Cycle> = repo.all().await.unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].name, "Cycle 1");
    assert_eq!(cycles[0].start_date, date("2025-07-20"));
    assert_eq!(cycles[0].notes, AUTO_CREATED_NOTE);

    let cages: Vec<Cage> = repo.all().await.unwrap();
    let a1 = cages.iter().find(|cage| cage.name == "Cage A1").unwrap();
    assert_eq!(a1.capacity, 500);
    assert_eq!(a1.breed, "Mixed");
    // Follows the newest imported day
    assert_eq!(a1.current_birds, 97);
}

#[tokio::test]
async fn test_older_rows_do_not_move_current_birds() {
    let store = store();
    let service = CsvImportService::new(store.clone());
    service
        .import_production_logs(&production_csv(&["2025-07-21,Cycle 1,Cage A1,150,99,2,0,80,97,80.8,"]))
        .await
        .unwrap();
    service
        .import_production_logs(&production_csv(&["2025-07-10,Cycle 1,Cage A1,139,140,0,0,120,140,85.7,"]))
        .await
        .unwrap();

    let cages: Vec<Cage> = Repository::new(store).all().await.unwrap();
    assert_eq!(cages.len(), 1);
    assert_eq!(cages[0].current_birds, 97);
}

#[tokio::test]
async fn test_duplicate_date_updates_in_place() {
    let store = store();
    let service = CsvImportService::new(store.clone());
    service
        .import_production_logs(&production_csv(&["2025-07-21,Cycle 1,Cage A1,150,100,0,0,80,100,80.0,first"]))
        .await
        .unwrap();
    let results = service
        .import_production_logs(&production_csv(&["2025-07-21,Cycle 1,Cage A1,150,100,0,0,90,100,90.0,second"]))
        .await
        .unwrap();

    assert_eq!(results.updated, 1);
    let logs: Vec<ProductionLog> = Repository::new(store).all().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].eggs(), Eggs(90.0));
    assert_eq!(logs[0].notes, "second");
}

#[tokio::test]
async fn test_cages_are_scoped_to_their_cycle() {
    let store = store();
    let text = production_csv(&[
        "2025-07-21,Cycle 1,Cage A1,150,100,0,0,80,100,80.0,",
        "2025-07-21,Cycle 2,Cage A1,20,300,0,0,0,300,0.0,",
    ]);

    let results = CsvImportService::new(store.clone())
        .import_production_logs(&text)
        .await
        .unwrap();

    assert_eq!(results.new_cycles, 2);
    assert_eq!(results.new_cages, 2);
    let logs: Vec<ProductionLog> = Repository::new(store).all().await.unwrap();
    assert_ne!(logs[0].cage_id, logs[1].cage_id);
}

#[tokio::test]
async fn test_cycle_resolved_by_id() {
    let store = store();
    let cycle = seed_cycle(&store, "Layers 2025").await;
    let text = production_csv(&[&format!("2025-07-21,{},Cage A1,150,100,0,0,80,100,80.0,", cycle.id)]);

    let results = CsvImportService::new(store.clone())
        .import_production_logs(&text)
        .await
        .unwrap();

    assert_eq!(results.new_cycles, 0);
    let logs: Vec<ProductionLog> = Repository::new(store).all().await.unwrap();
    assert_eq!(logs[0].cycle_id, cycle.id);
}

#[tokio::test]
async fn test_trays_column_converts_to_eggs() {
    let store = store();
    let text = "Date,Cycle,Cage,Opening_Birds,Eggs_Trays\n2025-07-21,Cycle 1,Cage A1,100,2.5";

    CsvImportService::new(store.clone())
        .import_production_logs(text)
        .await
        .unwrap();

    let logs: Vec<ProductionLog> = Repository::new(store).all().await.unwrap();
    assert_eq!(logs[0].eggs(), Eggs(75.0));
}

// ============================================================================
// Missing references
// ============================================================================

#[tokio::test]
async fn test_reject_policy_names_available_cycles() {
    let store = store();
    seed_cycle(&store, "Layers 2025").await;
    let text = production_csv(&["2025-07-21,Cycle 9,Cage A1,150,100,0,0,80,100,80.0,"]);

    let results = CsvImportService::new(store.clone())
        .with_policy(MissingReferencePolicy::Reject)
        .import_production_logs(&text)
        .await
        .unwrap();

    assert_eq!(results.success, 0);
    assert_eq!(results.new_cycles, 0);
    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].row, 2);
    assert!(results.errors[0].message.contains("Cycle 9"));
    assert!(results.errors[0].message.contains("Layers 2025"));

    let logs: Vec<ProductionLog> = Repository::new(store).all().await.unwrap();
    assert!(logs.is_empty());
}

#[tokio::test]
async fn test_reject_policy_applies_to_cages() {
    let store = store();
    let cycle = seed_cycle(&store, "Layers 2025").await;
    let mut cage = Cage::new(cycle.id, "Cage A1", 500, 480);
    Repository::new(store.clone()).add(&mut cage).await.unwrap();

    let text = production_csv(&[
        "2025-07-21,Layers 2025,Cage A1,150,480,0,0,400,480,83.3,",
        "2025-07-21,Layers 2025,Cage Z9,150,100,0,0,80,100,80.0,",
    ]);
    let results = CsvImportService::new(store)
        .with_policy(MissingReferencePolicy::Reject)
        .import_production_logs(&text)
        .await
        .unwrap();

    assert_eq!(results.success, 1);
    assert_eq!(results.new_cages, 0);
    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].row, 3);
    assert!(results.errors[0].message.contains("Cage Z9"));
    assert!(results.errors[0].message.contains("Cage A1"));
}

#[tokio::test]
async fn test_reject_policy_on_empty_store() {
    let results = CsvImportService::new(store())
        .with_policy(MissingReferencePolicy::Reject)
        .import_sales("Date,Cycle,Customer,Crates,Price_Per_Crate\n2025-07-21,Cycle 1,Market,10,40")
        .await
        .unwrap();

    assert_eq!(results.errors.len(), 1);
    assert!(results.errors[0].message.contains("none"));
}

// ============================================================================
// Row errors
// ============================================================================

#[tokio::test]
async fn test_bad_rows_are_isolated() {
    let store = store();
    let text = production_csv(&[
        "2025-07-20,Cycle 1,Cage A1,149,100,1,0,85,99,85.0,",
        "yesterday,Cycle 1,Cage A1,150,99,2,0,80,97,80.8,",
        "2025-07-22,,Cage A1,151,97,0,0,80,97,82.5,",
        "2025-07-23,Cycle 1,,152,97,0,0,80,97,82.5,",
        "2025-07-24,Cycle 1,Cage A1,153,97,0,0,80,97,82.5,",
    ]);

    let results = CsvImportService::new(store.clone())
        .import_production_logs(&text)
        .await
        .unwrap();

    assert_eq!(results.success, 2);
    let rows: Vec<usize> = results.errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![3, 4, 5]);
    assert!(results.errors[0].message.contains("Invalid date"));
    assert_eq!(results.errors[1].message, "Missing cycle reference");
    assert_eq!(results.errors[2].message, "Missing cage reference");

    let logs: Vec<ProductionLog> = Repository::new(store).all().await.unwrap();
    assert_eq!(logs.len(), 2);
}

#[tokio::test]
async fn test_failed_row_creates_no_cycle() {
    let store = store();
    let text = production_csv(&["2025-07-21,Ghost,,150,100,0,0,80,100,80.0,"]);

    let results = CsvImportService::new(store.clone())
        .import_production_logs(&text)
        .await
        .unwrap();

    assert_eq!(results.new_cycles, 0);
    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].message, "Missing cage reference");

    let cycles: Vec<Cycle> = Repository::new(store).all().await.unwrap();
    assert!(cycles.is_empty());
}

#[tokio::test]
async fn test_header_only_file_imports_nothing() {
    let results = CsvImportService::new(store())
        .import_production_logs(PRODUCTION_HEADER)
        .await
        .unwrap();
    assert_eq!(results.rows_seen(), 0);
}

// ============================================================================
// Other entities
// ============================================================================

#[tokio::test]
async fn test_sale_amount_falls_back_to_quantities() {
    let store = store();
    let text = "Date,Cycle,Sale_Type,Customer,Crates,Price_Per_Crate,Bird_Quantity,Price_Per_Bird,Weight_Kg,Total_Amount,Payment_Method,Notes\n\
                2025-07-21,Cycle 1,egg,Market,10,40.00,,,,,,\n\
                2025-07-22,Cycle 1,egg,Market,10,40.00,,,,450.00,transfer,\n\
                2025-07-23,Cycle 1,bird,Butcher,,,20,150.00,36.5,,cash,Spent hens";

    let results = CsvImportService::new(store.clone()).import_sales(text).await.unwrap();
    assert!(results.is_clean());
    assert_eq!(results.new_cycles, 1);

    let sales: Vec<Sale> = Repository::new(store).all().await.unwrap();
    assert_eq!(sales[0].amount, Decimal::from(400));
    assert_eq!(sales[0].payment_method, "cash");
    assert_eq!(sales[1].amount, Decimal::from(450));
    assert_eq!(sales[1].payment_method, "transfer");
    assert_eq!(sales[2].sale_type, SaleType::Bird);
    assert_eq!(sales[2].amount, Decimal::from(3000));
    assert_eq!(sales[2].bird_quantity, Some(20));
}

#[tokio::test]
async fn test_unknown_sale_type_is_a_row_error() {
    let results = CsvImportService::new(store())
        .import_sales("Date,Cycle,Sale_Type,Customer\n2025-07-21,Cycle 1,manure,Farm")
        .await
        .unwrap();
    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].message, "Unknown sale type");
}

#[tokio::test]
async fn test_expense_defaults() {
    let store = store();
    let results = CsvImportService::new(store.clone())
        .import_expenses("Date,Cycle,Description,Amount\n2025-07-21,Cycle 1,Vet visit,250.50")
        .await
        .unwrap();
    assert!(results.is_clean());

    let expenses: Vec<Expense> = Repository::new(store).all().await.unwrap();
    assert_eq!(expenses[0].category, "other");
    assert_eq!(expenses[0].payment_method, "cash");
    assert_eq!(expenses[0].amount, Decimal::new(25050, 2));
}

#[tokio::test]
async fn test_feed_log_import() {
    let store = store();
    CsvImportService::new(store.clone())
        .import_feed_logs("Date,Cycle,Feed_Consumed_Kg,Feed_Cost,Notes\n2025-07-21,Cycle 1,25.5,85.00,Daily")
        .await
        .unwrap();

    let feed: Vec<FeedLog> = Repository::new(store).all().await.unwrap();
    assert_eq!(feed[0].amount, FeedKg(25.5));
    assert_eq!(feed[0].cost, Decimal::from(85));
    assert!(feed[0].cycle_id.is_some());
    assert_eq!(feed[0].cage_id, None);
}

#[tokio::test]
async fn test_every_template_imports_cleanly() {
    for kind in EntityKind::ALL {
        let results = CsvImportService::new(store())
            .import(kind, &kind.template())
            .await
            .unwrap();
        assert!(results.is_clean(), "{} template: {:?}", kind, results.errors);
        assert_eq!(results.success, 1, "{} template", kind);
    }
}
