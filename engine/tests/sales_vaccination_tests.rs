//! Sales and vaccination service tests
//!
//! Covers:
//! - Property 4: Egg sale amount equals crates times price per crate
//! - Sales summary totals
//! - Vaccination flock age and schedule completion

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use poultry_ledger::error::AppError;
use poultry_ledger::services::{SalesService, VaccinationService};
use poultry_ledger::storage::{MemoryStore, Repository, Store};
use shared::models::{Cycle, SaleInput, SaleType, VaccinationInput};
use shared::units::Eggs;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn setup() -> (Arc<dyn Store>, Cycle) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut cycle = Cycle::new("Cycle 1", date("2025-01-01"));
    Repository::new(store.clone()).add(&mut cycle).await.unwrap();
    (store, cycle)
}

fn egg_sale(cycle_id: i64, day: &str, crates: Decimal, price: Decimal) -> SaleInput {
    SaleInput {
        cycle_id,
        date: date(day),
        sale_type: SaleType::Egg,
        customer: "Local Market".to_string(),
        crates,
        price_per_crate: price,
        bird_quantity: None,
        price_per_bird: None,
        weight_kg: None,
        payment_method: "cash".to_string(),
        notes: String::new(),
    }
}

fn vaccination(cycle_id: i64, day: &str, name: &str) -> VaccinationInput {
    VaccinationInput {
        cycle_id,
        date: date(day),
        vaccine_name: name.to_string(),
        administration_method: "drinking_water".to_string(),
        dosage: "1 dose/bird".to_string(),
        birds_treated: 500,
        batch_number: "B-17".to_string(),
        expiry_date: None,
        manufacturer: String::new(),
        veterinarian: String::new(),
        notes: String::new(),
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property 4: Egg sale amount is crates x price per crate
    #[test]
    fn prop_egg_sale_amount(crates in 1i64..500, price_cents in 0i64..10000) {
        let (store, cycle) = tokio_test::block_on(setup());
        let crates = Decimal::from(crates);
        let price = Decimal::new(price_cents, 2);

        let sale = tokio_test::block_on(
            SalesService::new(store).record_sale(egg_sale(cycle.id, "2025-07-21", crates, price)),
        )
        .unwrap();
        prop_assert_eq!(sale.amount, crates * price);
    }
}

// ============================================================================
// Sales
// ============================================================================

#[tokio::test]
async fn test_sales_summary() {
    let (store, cycle) = setup().await;
    let service = SalesService::new(store);
    service
        .record_sale(egg_sale(cycle.id, "2025-07-20", Decimal::from(10), Decimal::from(40)))
        .await
        .unwrap();
    service
        .record_sale(egg_sale(cycle.id, "2025-07-21", Decimal::from(5), Decimal::from(42)))
        .await
        .unwrap();
    let mut birds = egg_sale(cycle.id, "2025-07-22", Decimal::ZERO, Decimal::ZERO);
    birds.sale_type = SaleType::Bird;
    birds.bird_quantity = Some(20);
    birds.price_per_bird = Some(Decimal::from(150));
    let bird_sale = service.record_sale(birds).await.unwrap();
    assert_eq!(bird_sale.amount, Decimal::from(3000));

    let sales = service.list_sales(cycle.id).await.unwrap();
    assert_eq!(sales[0].date, date("2025-07-22"));

    let summary = service.summary(cycle.id).await.unwrap();
    assert_eq!(summary.total_amount, Decimal::from(3610));
    assert_eq!(summary.total_crates, Decimal::from(15));
    assert_eq!(summary.total_eggs_sold, Eggs(450.0));
    assert_eq!(summary.avg_price_per_crate, Decimal::from_str("40.67").unwrap());
}

#[tokio::test]
async fn test_sale_validation() {
    let (store, cycle) = setup().await;
    let service = SalesService::new(store);

    let err = service
        .record_sale(egg_sale(cycle.id, "2025-07-21", Decimal::ZERO, Decimal::from(40)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let mut birds = egg_sale(cycle.id, "2025-07-21", Decimal::ZERO, Decimal::ZERO);
    birds.sale_type = SaleType::Bird;
    assert!(service.record_sale(birds).await.is_err());

    let mut no_customer = egg_sale(cycle.id, "2025-07-21", Decimal::ONE, Decimal::ONE);
    no_customer.customer = String::new();
    assert!(matches!(
        service.record_sale(no_customer).await,
        Err(AppError::Validation { .. })
    ));
}

#[tokio::test]
async fn test_sale_for_missing_cycle() {
    let (store, _) = setup().await;
    let err = SalesService::new(store)
        .record_sale(egg_sale(77, "2025-07-21", Decimal::ONE, Decimal::ONE))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_sale() {
    let (store, cycle) = setup().await;
    let service = SalesService::new(store);
    let sale = service
        .record_sale(egg_sale(cycle.id, "2025-07-21", Decimal::ONE, Decimal::ONE))
        .await
        .unwrap();

    service.delete_sale(sale.id).await.unwrap();
    assert!(service.list_sales(cycle.id).await.unwrap().is_empty());
    assert!(matches!(service.delete_sale(sale.id).await, Err(AppError::NotFound(_))));
}

// ============================================================================
// Vaccinations
// ============================================================================

#[tokio::test]
async fn test_vaccination_flock_age_from_cycle() {
    let (store, cycle) = setup().await;
    let recorded = VaccinationService::new(store)
        .record(vaccination(cycle.id, "2025-01-15", "Gumboro (IBD)"))
        .await
        .unwrap();
    assert_eq!(recorded.flock_age, 14);
    assert!(recorded.id > 0);
}

#[tokio::test]
async fn test_schedule_completion() {
    let (store, cycle) = setup().await;
    let service = VaccinationService::new(store);
    service
        .record(vaccination(cycle.id, "2025-01-02", "Marek's Disease HVT"))
        .await
        .unwrap();
    // Age 8, within three days of the day 7 entry only
    service
        .record(vaccination(cycle.id, "2025-01-09", "newcastle + ib"))
        .await
        .unwrap();

    let schedule = service.schedule(cycle.id).await.unwrap();
    assert_eq!(schedule.len(), 9);
    let done: Vec<u32> = schedule.iter().filter(|item| item.completed).map(|item| item.day).collect();
    assert_eq!(done, vec![1, 7]);
}

#[tokio::test]
async fn test_vaccination_errors() {
    let (store, cycle) = setup().await;
    let service = VaccinationService::new(store);

    let mut none_treated = vaccination(cycle.id, "2025-01-02", "Fowl Pox");
    none_treated.birds_treated = 0;
    assert!(matches!(service.record(none_treated).await, Err(AppError::Validation { .. })));

    assert!(matches!(
        service.record(vaccination(404, "2025-01-02", "Fowl Pox")).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(service.schedule(404).await, Err(AppError::NotFound(_))));
    assert!(matches!(service.delete(1).await, Err(AppError::NotFound(_))));
}
