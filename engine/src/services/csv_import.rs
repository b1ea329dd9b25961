//! CSV import reconciliation
//!
//! Each row is resolved against the existing cycles and cages, turned into a
//! record and stored on its own. A bad row is reported with its line number
//! and never stops the batch; rows already stored stay stored.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use shared::csv_text::{columns, parse_csv, CsvRow, EntityKind};
use shared::models::{Cage, Cycle, Expense, FeedLog, ProductionLog, Sale, SaleType};
use shared::types::{ImportResults, MissingReferencePolicy};
use shared::units::{Eggs, FeedKg, Trays};
use shared::validation::{parse_flexible_date, validate_reference};

use crate::error::{AppError, AppResult};
use crate::storage::{Repository, Store};

/// Note written on records an import had to create
pub const AUTO_CREATED_NOTE: &str = "Auto-created from CSV import";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub policy: MissingReferencePolicy,
    /// Capacity of cages created for unknown cage references
    pub default_cage_capacity: u32,
    pub default_breed: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            policy: MissingReferencePolicy::AutoCreate,
            default_cage_capacity: 500,
            default_breed: "Mixed".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct CsvImportService {
    repo: Repository,
    options: ImportOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
struct CageRef {
    id: i64,
    cycle_id: i64,
    name: String,
}

/// Name and id lookups for one batch, grown as records get created
#[derive(Debug, Default)]
struct Lookups {
    cycle_names: BTreeMap<i64, String>,
    cycles_by_name: HashMap<String, i64>,
    cages: Vec<CageRef>,
    /// Existing production logs by cage and date
    production_logs: HashMap<(i64, NaiveDate), ProductionLog>,
    /// Latest logged date per cage
    latest_dates: HashMap<i64, NaiveDate>,
}

impl Lookups {
    fn add_cycle(&mut self, cycle: &Cycle) {
        self.cycle_names.insert(cycle.id, cycle.display_name());
        self.cycles_by_name.insert(cycle.name.clone(), cycle.id);
    }

    fn add_cage(&mut self, cage: &Cage) {
        self.cages.push(CageRef {
            id: cage.id,
            cycle_id: cage.cycle_id,
            name: cage.name.clone(),
        });
    }

    fn add_log(&mut self, log: &ProductionLog) {
        self.production_logs.insert((log.cage_id, log.date), log.clone());
        let latest = self.latest_dates.entry(log.cage_id).or_insert(log.date);
        if log.date > *latest {
            *latest = log.date;
        }
    }

    /// Cycle by name, then by numeric id
    fn find_cycle(&self, reference: &str) -> Option<i64> {
        self.cycles_by_name.get(reference).copied().or_else(|| {
            reference
                .parse::<i64>()
                .ok()
                .filter(|id| self.cycle_names.contains_key(id))
        })
    }

    /// Cage of the given cycle by name, then by numeric id
    fn find_cage(&self, cycle_id: i64, reference: &str) -> Option<i64> {
        let mut in_cycle = self.cages.iter().filter(|cage| cage.cycle_id == cycle_id);
        if let Some(cage) = in_cycle.clone().find(|cage| cage.name == reference) {
            return Some(cage.id);
        }
        let id = reference.parse::<i64>().ok()?;
        in_cycle.find(|cage| cage.id == id).map(|cage| cage.id)
    }

    fn available_cycles(&self) -> String {
        if self.cycle_names.is_empty() {
            return "none".to_string();
        }
        self.cycle_names.values().cloned().collect::<Vec<_>>().join(", ")
    }

    fn available_cages(&self, cycle_id: i64) -> String {
        let names: Vec<&str> = self
            .cages
            .iter()
            .filter(|cage| cage.cycle_id == cycle_id)
            .map(|cage| cage.name.as_str())
            .collect();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    }
}

/// Text shown for a failed row
fn row_message(error: &AppError) -> String {
    match error {
        AppError::Validation { message, .. } => message.clone(),
        AppError::ValidationError(message) => message.clone(),
        AppError::NotFound(resource) => format!("{} not found", resource),
        other => other.to_string(),
    }
}

fn row_date(row: &CsvRow) -> AppResult<NaiveDate> {
    parse_flexible_date(&row.text(columns::DATE)).map_err(|msg| AppError::validation("Date", msg))
}

fn cycle_reference(row: &CsvRow) -> AppResult<String> {
    let reference = row.text(columns::CYCLE);
    validate_reference(&reference).map_err(|_| AppError::validation("Cycle", "Missing cycle reference"))?;
    Ok(reference)
}

fn cage_reference(row: &CsvRow) -> AppResult<String> {
    let reference = row.text(columns::CAGE);
    validate_reference(&reference).map_err(|_| AppError::validation("Cage", "Missing cage reference"))?;
    Ok(reference)
}

fn money_or_zero(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

impl CsvImportService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            repo: Repository::new(store),
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_policy(mut self, policy: MissingReferencePolicy) -> Self {
        self.options.policy = policy;
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import CSV text for any of the importable entities
    pub async fn import(&self, kind: EntityKind, text: &str) -> AppResult<ImportResults> {
        match kind {
            EntityKind::ProductionLogs => self.import_production_logs(text).await,
            EntityKind::Sales => self.import_sales(text).await,
            EntityKind::Expenses => self.import_expenses(text).await,
            EntityKind::FeedLogs => self.import_feed_logs(text).await,
        }
    }

    async fn load_lookups(&self, with_production: bool) -> AppResult<Lookups> {
        let mut lookups = Lookups::default();
        for cycle in self.repo.all::<Cycle>().await? {
            lookups.add_cycle(&cycle);
        }
        if with_production {
            for cage in self.repo.all::<Cage>().await? {
                lookups.add_cage(&cage);
            }
            for log in self.repo.all::<ProductionLog>().await? {
                lookups.add_log(&log);
            }
        }
        Ok(lookups)
    }

    fn finish(&self, kind: EntityKind, results: ImportResults) -> ImportResults {
        tracing::info!(
            entity = %kind,
            success = results.success,
            updated = results.updated,
            errors = results.errors.len(),
            new_cycles = results.new_cycles,
            new_cages = results.new_cages,
            "CSV import finished"
        );
        results
    }

    fn record_row(results: &mut ImportResults, row: &CsvRow, outcome: AppResult<RowOutcome>) {
        match outcome {
            Ok(RowOutcome::Created) => results.success += 1,
            Ok(RowOutcome::Updated) => {
                results.success += 1;
                results.updated += 1;
            }
            Err(e) => {
                let message = row_message(&e);
                tracing::warn!(row = row.number, error = %message, "Skipped CSV row");
                results.record_error(row.number, message);
            }
        }
    }

    /// Resolve a cycle reference, creating the cycle if allowed
    ///
    /// Callers run every row-local check first, so a created cycle always
    /// belongs to a row that gets stored.
    async fn resolve_cycle(
        &self,
        lookups: &mut Lookups,
        results: &mut ImportResults,
        reference: String,
        date: NaiveDate,
    ) -> AppResult<i64> {
        if let Some(id) = lookups.find_cycle(&reference) {
            return Ok(id);
        }

        match self.options.policy {
            MissingReferencePolicy::Reject => Err(AppError::validation(
                "Cycle",
                format!(
                    "Cycle \"{}\" not found. Available cycles: {}",
                    reference,
                    lookups.available_cycles()
                ),
            )),
            MissingReferencePolicy::AutoCreate => {
                let mut cycle = Cycle {
                    notes: AUTO_CREATED_NOTE.to_string(),
                    created_at: Some(Utc::now()),
                    ..Cycle::new(reference, date)
                };
                self.repo.add(&mut cycle).await?;
                lookups.add_cycle(&cycle);
                results.new_cycles += 1;
                tracing::debug!(cycle_id = cycle.id, name = %cycle.name, "Created cycle for import");
                Ok(cycle.id)
            }
        }
    }

    /// Resolve a cage within its cycle, creating the cage if allowed
    async fn resolve_cage(
        &self,
        lookups: &mut Lookups,
        results: &mut ImportResults,
        row: &CsvRow,
        reference: String,
        cycle_id: i64,
    ) -> AppResult<i64> {
        if let Some(id) = lookups.find_cage(cycle_id, &reference) {
            return Ok(id);
        }

        match self.options.policy {
            MissingReferencePolicy::Reject => Err(AppError::validation(
                "Cage",
                format!(
                    "Cage \"{}\" not found in cycle \"{}\". Available cages: {}",
                    reference,
                    lookups.cycle_names.get(&cycle_id).cloned().unwrap_or_default(),
                    lookups.available_cages(cycle_id)
                ),
            )),
            MissingReferencePolicy::AutoCreate => {
                let opening = row.count(columns::OPENING_BIRDS);
                let mut cage = Cage {
                    breed: self.options.default_breed.clone(),
                    notes: AUTO_CREATED_NOTE.to_string(),
                    created_at: Some(Utc::now()),
                    ..Cage::new(cycle_id, reference, self.options.default_cage_capacity, opening)
                };
                self.repo.add(&mut cage).await?;
                lookups.add_cage(&cage);
                results.new_cages += 1;
                tracing::debug!(cage_id = cage.id, name = %cage.name, cycle_id, "Created cage for import");
                Ok(cage.id)
            }
        }
    }

    // ========================================================================
    // Production logs
    // ========================================================================

    /// Import daily production logs
    ///
    /// A row for a cage and date that already has a log replaces that log.
    /// Closing birds are recomputed from the row's movements, and the cage's
    /// bird count follows the newest imported day.
    pub async fn import_production_logs(&self, text: &str) -> AppResult<ImportResults> {
        let rows = parse_csv(text)?;
        let mut lookups = self.load_lookups(true).await?;
        let mut results = ImportResults::default();

        for row in &rows {
            let outcome = self.import_production_row(&mut lookups, &mut results, row).await;
            Self::record_row(&mut results, row, outcome);
        }
        Ok(self.finish(EntityKind::ProductionLogs, results))
    }

    async fn import_production_row(
        &self,
        lookups: &mut Lookups,
        results: &mut ImportResults,
        row: &CsvRow,
    ) -> AppResult<RowOutcome> {
        let date = row_date(row)?;
        let cycle_ref = cycle_reference(row)?;
        let cage_ref = cage_reference(row)?;
        let cycle_id = self.resolve_cycle(lookups, results, cycle_ref, date).await?;
        let cage_id = self.resolve_cage(lookups, results, row, cage_ref, cycle_id).await?;
        let now = Utc::now();

        let existing = lookups.production_logs.get(&(cage_id, date)).cloned();
        let outcome = if existing.is_some() {
            RowOutcome::Updated
        } else {
            RowOutcome::Created
        };
        let mut log = existing.unwrap_or_else(|| ProductionLog {
            created_at: Some(now),
            ..ProductionLog::new(cage_id, cycle_id, date)
        });

        log.cycle_id = cycle_id;
        log.flock_age = Some(row.count(columns::FLOCK_AGE)).filter(|age| *age > 0);
        log.opening_birds = row.count(columns::OPENING_BIRDS);
        log.mortality = row.count(columns::MORTALITY);
        log.birds_sold = row.count(columns::BIRDS_SOLD);
        if row.is_present(columns::EGGS_TRAYS) {
            let trays = Trays(row.number(columns::EGGS_TRAYS).max(0.0));
            log.eggs_trays = Some(trays);
            log.eggs_produced = Some(trays.to_eggs());
        } else {
            log.eggs_trays = None;
            log.eggs_produced = Some(Eggs(row.number(columns::EGGS_PRODUCED).max(0.0).round()));
        }
        log.current_feed = Some(FeedKg(row.number(columns::CURRENT_FEED))).filter(|feed| feed.value() > 0.0);
        log.notes = row.text(columns::NOTES);
        log.updated_at = Some(now);
        log.recompute_closing();

        if row.is_present(columns::CLOSING_BIRDS) && row.count(columns::CLOSING_BIRDS) != log.closing_birds {
            tracing::debug!(
                row = row.number,
                given = row.count(columns::CLOSING_BIRDS),
                computed = log.closing_birds,
                "Closing birds recomputed from movements"
            );
        }

        self.repo.put(&mut log).await?;
        lookups.add_log(&log);

        if lookups.latest_dates.get(&cage_id) == Some(&date) {
            if let Some(mut cage) = self.repo.get::<Cage>(cage_id).await? {
                cage.current_birds = log.closing_birds;
                cage.updated_at = Some(now);
                self.repo.put(&mut cage).await?;
            }
        }

        Ok(outcome)
    }

    // ========================================================================
    // Sales
    // ========================================================================

    pub async fn import_sales(&self, text: &str) -> AppResult<ImportResults> {
        let rows = parse_csv(text)?;
        let mut lookups = self.load_lookups(false).await?;
        let mut results = ImportResults::default();

        for row in &rows {
            let outcome = self.import_sale_row(&mut lookups, &mut results, row).await;
            Self::record_row(&mut results, row, outcome);
        }
        Ok(self.finish(EntityKind::Sales, results))
    }

    async fn import_sale_row(
        &self,
        lookups: &mut Lookups,
        results: &mut ImportResults,
        row: &CsvRow,
    ) -> AppResult<RowOutcome> {
        let date = row_date(row)?;
        let sale_type = match row.get(columns::SALE_TYPE) {
            Some(value) => value
                .parse::<SaleType>()
                .map_err(|msg| AppError::validation("Sale_Type", msg))?,
            None => SaleType::Egg,
        };
        let cycle_ref = cycle_reference(row)?;
        let cycle_id = self.resolve_cycle(lookups, results, cycle_ref, date).await?;

        let mut sale = Sale {
            id: 0,
            cycle_id,
            date,
            sale_type,
            customer: row.text(columns::CUSTOMER),
            crates: Decimal::ZERO,
            price_per_crate: Decimal::ZERO,
            bird_quantity: None,
            price_per_bird: None,
            weight_kg: None,
            amount: Decimal::ZERO,
            payment_method: row.text_or(columns::PAYMENT_METHOD, "cash"),
            notes: row.text(columns::NOTES),
            created_at: Some(Utc::now()),
        };
        match sale_type {
            SaleType::Egg => {
                sale.crates = money_or_zero(row.money(columns::CRATES));
                sale.price_per_crate = money_or_zero(row.money(columns::PRICE_PER_CRATE));
            }
            SaleType::Bird => {
                sale.bird_quantity = Some(row.count(columns::BIRD_QUANTITY));
                sale.price_per_bird = Some(money_or_zero(row.money(columns::PRICE_PER_BIRD)));
                sale.weight_kg = Some(money_or_zero(row.money(columns::WEIGHT_KG)));
            }
        }
        let given = row.money(columns::TOTAL_AMOUNT);
        sale.amount = if given > Decimal::ZERO {
            given
        } else {
            sale.computed_amount()
        };

        self.repo.add(&mut sale).await?;
        Ok(RowOutcome::Created)
    }

    // ========================================================================
    // Expenses
    // ========================================================================

    pub async fn import_expenses(&self, text: &str) -> AppResult<ImportResults> {
        let rows = parse_csv(text)?;
        let mut lookups = self.load_lookups(false).await?;
        let mut results = ImportResults::default();

        for row in &rows {
            let outcome = self.import_expense_row(&mut lookups, &mut results, row).await;
            Self::record_row(&mut results, row, outcome);
        }
        Ok(self.finish(EntityKind::Expenses, results))
    }

    async fn import_expense_row(
        &self,
        lookups: &mut Lookups,
        results: &mut ImportResults,
        row: &CsvRow,
    ) -> AppResult<RowOutcome> {
        let date = row_date(row)?;
        let cycle_ref = cycle_reference(row)?;
        let cycle_id = self.resolve_cycle(lookups, results, cycle_ref, date).await?;

        let mut expense = Expense {
            id: 0,
            cycle_id,
            date,
            category: row.text_or(columns::CATEGORY, "other"),
            description: row.text(columns::DESCRIPTION),
            amount: money_or_zero(row.money(columns::AMOUNT)),
            payment_method: row.text_or(columns::PAYMENT_METHOD, "cash"),
            notes: row.text(columns::NOTES),
            created_at: Some(Utc::now()),
        };
        self.repo.add(&mut expense).await?;
        Ok(RowOutcome::Created)
    }

    // ========================================================================
    // Feed logs
    // ========================================================================

    pub async fn import_feed_logs(&self, text: &str) -> AppResult<ImportResults> {
        let rows = parse_csv(text)?;
        let mut lookups = self.load_lookups(false).await?;
        let mut results = ImportResults::default();

        for row in &rows {
            let outcome = self.import_feed_row(&mut lookups, &mut results, row).await;
            Self::record_row(&mut results, row, outcome);
        }
        Ok(self.finish(EntityKind::FeedLogs, results))
    }

    async fn import_feed_row(
        &self,
        lookups: &mut Lookups,
        results: &mut ImportResults,
        row: &CsvRow,
    ) -> AppResult<RowOutcome> {
        let date = row_date(row)?;
        let cycle_ref = cycle_reference(row)?;
        let cycle_id = self.resolve_cycle(lookups, results, cycle_ref, date).await?;
        let now = Utc::now();

        let mut feed_log = FeedLog {
            cycle_id: Some(cycle_id),
            cost: money_or_zero(row.money(columns::FEED_COST)),
            notes: row.text(columns::NOTES),
            created_at: Some(now),
            updated_at: Some(now),
            ..FeedLog::new(date, FeedKg(row.number(columns::FEED_CONSUMED).max(0.0)))
        };
        self.repo.add(&mut feed_log).await?;
        Ok(RowOutcome::Created)
    }
}
