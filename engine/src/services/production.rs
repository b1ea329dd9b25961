//! Daily production logging for a cage

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use validator::Validate;

use shared::lifecycle;
use shared::models::{Cage, Cycle, DailyProductionInput, FeedLog, ProductionLog};
use shared::units::{FeedKg, Grams, Trays};
use shared::validation::validate_egg_weight;

use crate::error::{AppError, AppResult};
use crate::storage::{Repository, Store};

/// Production service for recording one cage-day at a time
#[derive(Clone)]
pub struct ProductionService {
    repo: Repository,
}

/// Result of saving a day's entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDailyLog {
    pub log: ProductionLog,
    pub feed_log: Option<FeedLog>,
    /// The cage with its bird count moved to the day's closing stock
    pub cage: Cage,
    /// False when an existing entry for the date was replaced
    pub created: bool,
}

/// Values to prefill the daily entry form with
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDefaults {
    pub date: NaiveDate,
    pub flock_age: u32,
    pub opening_birds: u32,
    pub mortality: u32,
    pub birds_sold: u32,
    pub eggs_trays: Option<Trays>,
    pub current_feed: Option<FeedKg>,
    pub notes: String,
    /// Set when the date already has an entry that a save would replace
    pub existing_log_id: Option<i64>,
}

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    async fn load_cage(&self, cage_id: i64) -> AppResult<Cage> {
        self.repo
            .get::<Cage>(cage_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cage", cage_id))
    }

    /// Production logs of a cage, oldest first
    pub async fn logs_for_cage(&self, cage_id: i64) -> AppResult<Vec<ProductionLog>> {
        let mut logs: Vec<ProductionLog> = self.repo.by_index("cageId", cage_id).await?;
        logs.sort_by_key(|log| log.date);
        Ok(logs)
    }

    /// Feed logs recorded against a cage, oldest first
    pub async fn feed_logs_for_cage(&self, cage_id: i64) -> AppResult<Vec<FeedLog>> {
        let mut logs: Vec<FeedLog> = self.repo.by_index("cageId", cage_id).await?;
        logs.sort_by_key(|log| log.date);
        Ok(logs)
    }

    /// Opening birds for a new entry on `date`
    pub async fn opening_birds_for(&self, cage_id: i64, date: NaiveDate) -> AppResult<u32> {
        let cage = self.load_cage(cage_id).await?;
        let logs = self.logs_for_cage(cage_id).await?;
        Ok(lifecycle::opening_birds_for(&cage, &logs, date))
    }

    /// Prefill values for the entry form of `date`
    pub async fn entry_defaults(&self, cage_id: i64, date: NaiveDate) -> AppResult<EntryDefaults> {
        let cage = self.load_cage(cage_id).await?;
        let logs = self.logs_for_cage(cage_id).await?;

        if let Some(log) = logs.iter().find(|log| log.date == date) {
            return Ok(EntryDefaults {
                date,
                flock_age: log.flock_age.unwrap_or_default(),
                opening_birds: log.opening_birds,
                mortality: log.mortality,
                birds_sold: log.birds_sold,
                eggs_trays: Some(log.trays()),
                current_feed: log.current_feed,
                notes: log.notes.clone(),
                existing_log_id: Some(log.id),
            });
        }

        let cycle = self.repo.get::<Cycle>(cage.cycle_id).await?;
        Ok(EntryDefaults {
            date,
            flock_age: cycle.map_or(1, |cycle| cycle.flock_age_on(date)),
            opening_birds: lifecycle::opening_birds_for(&cage, &logs, date),
            mortality: 0,
            birds_sold: 0,
            eggs_trays: None,
            current_feed: None,
            notes: String::new(),
            existing_log_id: None,
        })
    }

    /// Save the day's entry for a cage
    ///
    /// An entry for the same cage and date is replaced, never duplicated. Feed
    /// above zero is mirrored into the cage's feed log for the date, and the
    /// cage's bird count becomes the day's closing stock.
    pub async fn save_daily_log(&self, input: DailyProductionInput) -> AppResult<SavedDailyLog> {
        input.validate()?;
        if let Some(grams) = input.avg_egg_weight {
            validate_egg_weight(grams).map_err(|msg| AppError::validation("avgEggWeight", msg))?;
        }

        let cage_id = input.cage_id;
        let date = input.date;
        let result = self.write_daily_log(input).await;
        match &result {
            Ok(saved) => tracing::info!(
                cage_id,
                %date,
                created = saved.created,
                closing_birds = saved.log.closing_birds,
                "Saved daily production log"
            ),
            Err(e) => tracing::error!(cage_id, %date, error = %e, "Failed to save daily production log"),
        }
        result
    }

    async fn write_daily_log(&self, input: DailyProductionInput) -> AppResult<SavedDailyLog> {
        let mut cage = self.load_cage(input.cage_id).await?;
        let cycle = self.repo.get::<Cycle>(cage.cycle_id).await?;
        let now = Utc::now();

        let existing: Vec<ProductionLog> = self.repo.by_index("cageId", cage.id).await?;
        let previous = existing.into_iter().find(|log| log.date == input.date);
        let created = previous.is_none();

        let mut log = previous.unwrap_or_else(|| ProductionLog {
            created_at: Some(now),
            ..ProductionLog::new(cage.id, cage.cycle_id, input.date)
        });
        let trays = Trays(input.eggs_trays);
        log.flock_age = input
            .flock_age
            .or_else(|| cycle.as_ref().map(|cycle| cycle.flock_age_on(input.date)));
        log.opening_birds = input.opening_birds;
        log.mortality = input.mortality;
        log.birds_sold = input.birds_sold;
        log.eggs_trays = Some(trays);
        log.eggs_produced = Some(trays.to_eggs());
        log.current_feed = Some(FeedKg(input.current_feed)).filter(|feed| feed.value() > 0.0);
        log.avg_egg_weight = input.avg_egg_weight.map(Grams);
        log.notes = input.notes;
        log.updated_at = Some(now);
        log.recompute_closing();
        self.repo.put(&mut log).await?;

        let feed_log = match log.current_feed {
            Some(amount) => Some(self.upsert_feed_log(&cage, input.date, amount).await?),
            None => None,
        };

        cage.current_birds = log.closing_birds;
        cage.updated_at = Some(now);
        self.repo.put(&mut cage).await?;

        Ok(SavedDailyLog {
            log,
            feed_log,
            cage,
            created,
        })
    }

    async fn upsert_feed_log(&self, cage: &Cage, date: NaiveDate, amount: FeedKg) -> AppResult<FeedLog> {
        let now = Utc::now();
        let existing: Vec<FeedLog> = self.repo.by_index("cageId", cage.id).await?;
        let mut feed_log = existing
            .into_iter()
            .find(|log| log.date == date)
            .unwrap_or_else(|| FeedLog {
                cage_id: Some(cage.id),
                cycle_id: Some(cage.cycle_id),
                created_at: Some(now),
                ..FeedLog::new(date, amount)
            });
        feed_log.amount = amount;
        feed_log.updated_at = Some(now);
        self.repo.put(&mut feed_log).await?;
        Ok(feed_log)
    }

    /// Delete one production log
    pub async fn delete_log(&self, log_id: i64) -> AppResult<()> {
        let log = self
            .repo
            .get::<ProductionLog>(log_id)
            .await?
            .ok_or_else(|| AppError::not_found("Production log", log_id))?;
        self.repo.delete::<ProductionLog>(log.id).await?;
        tracing::info!(log_id, cage_id = log.cage_id, date = %log.date, "Deleted production log");
        Ok(())
    }
}
