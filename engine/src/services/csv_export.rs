//! CSV and JSON export of stored records, plus import templates

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use shared::csv_text::{to_csv, EntityKind};
use shared::lifecycle::effective_flock_age;
use shared::metrics::laying_percentage;
use shared::models::{Cage, Cycle, Expense, FeedLog, ProductionLog, Record, Sale};

use crate::error::AppResult;
use crate::storage::{Repository, Store};

use super::export_file_name;

/// A file ready to be written or downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub content: String,
}

#[derive(Clone)]
pub struct CsvExportService {
    repo: Repository,
}

/// Id to display name lookups for the reference columns
struct Names {
    cycles: HashMap<i64, (String, NaiveDate)>,
    cages: HashMap<i64, String>,
}

impl Names {
    fn cycle(&self, id: i64) -> String {
        self.cycles
            .get(&id)
            .map_or_else(|| id.to_string(), |(name, _)| name.clone())
    }

    fn cycle_start(&self, id: i64) -> Option<NaiveDate> {
        self.cycles.get(&id).map(|(_, start)| *start)
    }

    fn cage(&self, id: i64) -> String {
        self.cages.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl CsvExportService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Import template for an entity, with its download name
    pub fn template(kind: EntityKind) -> ExportFile {
        ExportFile {
            file_name: format!("{}-template.csv", kind.file_stem()),
            content: kind.template(),
        }
    }

    async fn names(&self) -> AppResult<Names> {
        let cycles = self
            .repo
            .all::<Cycle>()
            .await?
            .into_iter()
            .map(|cycle| (cycle.id, (cycle.display_name(), cycle.start_date)))
            .collect();
        let cages = self
            .repo
            .all::<Cage>()
            .await?
            .into_iter()
            .map(|cage| (cage.id, cage.name))
            .collect();
        Ok(Names { cycles, cages })
    }

    /// Records of one type, limited to a cycle when given, oldest first
    async fn records<T, F>(&self, cycle_id: Option<i64>, date: F) -> AppResult<Vec<T>>
    where
        T: Record,
        F: Fn(&T) -> NaiveDate,
    {
        let mut records: Vec<T> = match cycle_id {
            Some(id) => self.repo.by_index("cycleId", id).await?,
            None => self.repo.all().await?,
        };
        records.sort_by_key(|record| (date(record), record.id()));
        Ok(records)
    }

    /// Export one entity as CSV
    ///
    /// Cycle and cage columns carry names rather than ids so the file can be
    /// imported again as is.
    pub async fn export_csv(&self, kind: EntityKind, cycle_id: Option<i64>, today: NaiveDate) -> AppResult<ExportFile> {
        let names = self.names().await?;
        let rows: Vec<Vec<String>> = match kind {
            EntityKind::ProductionLogs => self
                .records::<ProductionLog, _>(cycle_id, |log| log.date)
                .await?
                .iter()
                .map(|log| production_row(log, &names))
                .collect(),
            EntityKind::Sales => self
                .records::<Sale, _>(cycle_id, |sale| sale.date)
                .await?
                .iter()
                .map(|sale| sale_row(sale, &names))
                .collect(),
            EntityKind::Expenses => self
                .records::<Expense, _>(cycle_id, |expense| expense.date)
                .await?
                .iter()
                .map(|expense| expense_row(expense, &names))
                .collect(),
            EntityKind::FeedLogs => self
                .records::<FeedLog, _>(cycle_id, |feed| feed.date)
                .await?
                .iter()
                .map(|feed| feed_row(feed, &names))
                .collect(),
        };

        let count = rows.len();
        let content = to_csv(kind.headers(), rows)?;
        let file_name = export_file_name(&format!("{}-export", kind.file_stem()), today, "csv");
        tracing::info!(entity = %kind, rows = count, %file_name, "Exported CSV");
        Ok(ExportFile { file_name, content })
    }

    /// Export one entity as a pretty-printed JSON array of stored records
    pub async fn export_json(&self, kind: EntityKind, cycle_id: Option<i64>, today: NaiveDate) -> AppResult<ExportFile> {
        let records: Vec<Value> = match kind {
            EntityKind::ProductionLogs => to_values(self.records::<ProductionLog, _>(cycle_id, |log| log.date).await?)?,
            EntityKind::Sales => to_values(self.records::<Sale, _>(cycle_id, |sale| sale.date).await?)?,
            EntityKind::Expenses => to_values(self.records::<Expense, _>(cycle_id, |expense| expense.date).await?)?,
            EntityKind::FeedLogs => to_values(self.records::<FeedLog, _>(cycle_id, |feed| feed.date).await?)?,
        };

        let content = serde_json::to_string_pretty(&records)?;
        let file_name = export_file_name(&format!("{}-export", kind.file_stem()), today, "json");
        tracing::info!(entity = %kind, rows = records.len(), %file_name, "Exported JSON");
        Ok(ExportFile { file_name, content })
    }
}

fn to_values<T: Record>(records: Vec<T>) -> AppResult<Vec<Value>> {
    records
        .iter()
        .map(|record| serde_json::to_value(record).map_err(Into::into))
        .collect()
}

fn production_row(log: &ProductionLog, names: &Names) -> Vec<String> {
    let eggs = log.eggs();
    let percent = laying_percentage(eggs, f64::from(log.opening_birds), 1);
    vec![
        log.date.to_string(),
        names.cycle(log.cycle_id),
        names.cage(log.cage_id),
        effective_flock_age(log, names.cycle_start(log.cycle_id)).to_string(),
        log.opening_birds.to_string(),
        log.mortality.to_string(),
        log.birds_sold.to_string(),
        // Trays like 4.1 convert with float noise; eggs are whole
        format!("{}", eggs.value().round()),
        log.closing_birds.to_string(),
        format!("{:.1}", percent),
        log.notes.clone(),
    ]
}

fn sale_row(sale: &Sale, names: &Names) -> Vec<String> {
    vec![
        sale.date.to_string(),
        names.cycle(sale.cycle_id),
        sale.sale_type.to_string(),
        sale.customer.clone(),
        sale.crates.to_string(),
        sale.price_per_crate.to_string(),
        optional(sale.bird_quantity),
        optional(sale.price_per_bird),
        optional(sale.weight_kg),
        sale.amount.to_string(),
        sale.payment_method.clone(),
        sale.notes.clone(),
    ]
}

fn expense_row(expense: &Expense, names: &Names) -> Vec<String> {
    vec![
        expense.date.to_string(),
        names.cycle(expense.cycle_id),
        expense.category.clone(),
        expense.description.clone(),
        expense.amount.to_string(),
        expense.payment_method.clone(),
        expense.notes.clone(),
    ]
}

fn feed_row(feed: &FeedLog, names: &Names) -> Vec<String> {
    vec![
        feed.date.to_string(),
        optional(feed.cycle_id.map(|id| names.cycle(id))),
        feed.amount.value().to_string(),
        feed.cost.to_string(),
        feed.notes.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_file() {
        let file = CsvExportService::template(EntityKind::FeedLogs);
        assert_eq!(file.file_name, "feed-logs-template.csv");
        assert!(file.content.starts_with("Date,Cycle,Feed_Consumed_Kg"));
    }

    #[test]
    fn test_names_fall_back_to_ids() {
        let names = Names {
            cycles: HashMap::new(),
            cages: HashMap::from([(3, "Cage A1".to_string())]),
        };
        assert_eq!(names.cycle(7), "7");
        assert_eq!(names.cage(3), "Cage A1");
        assert_eq!(names.cycle_start(7), None);
    }
}
