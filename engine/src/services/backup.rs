//! Full data backup, restore and reset

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared::models::{Cage, Collection, Cycle, Expense, FeedLog, ProductionLog, Record, Sale, Vaccination};

use crate::error::AppResult;
use crate::storage::{Repository, Store};

use super::export_file_name;

/// Version written into backup documents
pub const BACKUP_VERSION: &str = "1.0";

/// Every collection in one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    #[serde(default)]
    pub cages: Vec<Cage>,
    #[serde(default)]
    pub production_logs: Vec<ProductionLog>,
    #[serde(default)]
    pub feed_logs: Vec<FeedLog>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub vaccinations: Vec<Vaccination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl BackupDocument {
    pub fn record_counts(&self) -> BTreeMap<Collection, usize> {
        BTreeMap::from([
            (Collection::Cycles, self.cycles.len()),
            (Collection::Cages, self.cages.len()),
            (Collection::ProductionLogs, self.production_logs.len()),
            (Collection::FeedLogs, self.feed_logs.len()),
            (Collection::Sales, self.sales.len()),
            (Collection::Expenses, self.expenses.len()),
            (Collection::Vaccinations, self.vaccinations.len()),
        ])
    }
}

/// Cycles on their own, for moving cycle definitions between devices
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclesExport {
    pub cycles: Vec<Cycle>,
    pub export_date: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BackupService {
    repo: Repository,
}

impl BackupService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Snapshot every collection
    pub async fn export_all(&self, exported_at: DateTime<Utc>) -> AppResult<(String, BackupDocument)> {
        let document = BackupDocument {
            cycles: self.repo.all().await?,
            cages: self.repo.all().await?,
            production_logs: self.repo.all().await?,
            feed_logs: self.repo.all().await?,
            sales: self.repo.all().await?,
            expenses: self.repo.all().await?,
            vaccinations: self.repo.all().await?,
            export_date: Some(exported_at),
            version: Some(BACKUP_VERSION.to_string()),
        };
        let file_name = export_file_name("poultry-management-full-export", exported_at.date_naive(), "json");
        tracing::info!(%file_name, counts = ?document.record_counts(), "Exported full backup");
        Ok((file_name, document))
    }

    pub async fn export_cycles(&self, exported_at: DateTime<Utc>) -> AppResult<(String, CyclesExport)> {
        let export = CyclesExport {
            cycles: self.repo.all().await?,
            export_date: exported_at,
        };
        let file_name = export_file_name("cycles-export", exported_at.date_naive(), "json");
        tracing::info!(%file_name, cycles = export.cycles.len(), "Exported cycles");
        Ok((file_name, export))
    }

    /// Store every record of a backup document, keeping its id
    ///
    /// Records whose id already exists are replaced. With `replace` set the
    /// stores are emptied first so the result matches the document exactly.
    pub async fn restore(&self, document: BackupDocument, replace: bool) -> AppResult<BTreeMap<Collection, usize>> {
        if replace {
            self.clear_all().await?;
        }

        let counts = document.record_counts();
        self.put_all(document.cycles).await?;
        self.put_all(document.cages).await?;
        self.put_all(document.production_logs).await?;
        self.put_all(document.feed_logs).await?;
        self.put_all(document.sales).await?;
        self.put_all(document.expenses).await?;
        self.put_all(document.vaccinations).await?;

        tracing::info!(?counts, replace, "Restored backup");
        Ok(counts)
    }

    async fn put_all<T: Record>(&self, records: Vec<T>) -> AppResult<()> {
        for mut record in records {
            self.repo.put(&mut record).await?;
        }
        Ok(())
    }

    /// Empty every collection
    pub async fn clear_all(&self) -> AppResult<()> {
        for collection in Collection::ALL {
            self.repo.store().clear(collection).await?;
        }
        tracing::warn!("Cleared all collections");
        Ok(())
    }
}
