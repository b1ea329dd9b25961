//! Analytics over one cycle or the whole farm

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use shared::metrics::{laying_rate_over_logs, total_eggs, total_feed};
use shared::models::{Cage, Cycle, FeedLog, ProductionLog};
use shared::report::{AnalyticsFilter, AnalyticsReport};
use shared::types::DateRange;
use shared::units::{Eggs, FeedKg};

use crate::error::{AppError, AppResult};
use crate::storage::{Repository, Store};

use super::export_file_name;

#[derive(Clone)]
pub struct AnalyticsService {
    repo: Repository,
    default_range: DateRange,
}

/// Records the analytics are computed from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    /// `None` for the all-cycles overview
    pub cycle: Option<Cycle>,
    pub cages: Vec<Cage>,
    pub production_logs: Vec<ProductionLog>,
    pub feed_logs: Vec<FeedLog>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_production: Eggs,
    pub total_feed: FeedKg,
    pub avg_laying_rate: f64,
    pub export_date: DateTime<Utc>,
}

/// Downloadable analytics document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsExport {
    #[serde(flatten)]
    pub data: AnalyticsData,
    pub summary: AnalyticsSummary,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            repo: Repository::new(store),
            default_range: DateRange::default(),
        }
    }

    /// Use a different date range when the caller does not pick one
    pub fn with_default_range(mut self, range: DateRange) -> Self {
        self.default_range = range;
        self
    }

    pub fn default_filter(&self, as_of: NaiveDate) -> AnalyticsFilter {
        AnalyticsFilter::new(as_of).with_range(self.default_range)
    }

    /// Load one cycle's records, or everything when no cycle is given
    pub async fn load(&self, cycle_id: Option<i64>) -> AppResult<AnalyticsData> {
        let data = match cycle_id {
            Some(id) => {
                let cycle = self
                    .repo
                    .get::<Cycle>(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Cycle", id))?;
                AnalyticsData {
                    cycle: Some(cycle),
                    cages: self.repo.by_index("cycleId", id).await?,
                    production_logs: self.repo.by_index("cycleId", id).await?,
                    feed_logs: self.repo.by_index("cycleId", id).await?,
                }
            }
            None => AnalyticsData {
                cycle: None,
                cages: self.repo.all().await?,
                production_logs: self.repo.all().await?,
                feed_logs: self.repo.all().await?,
            },
        };
        tracing::debug!(
            cycle_id = ?cycle_id,
            cages = data.cages.len(),
            logs = data.production_logs.len(),
            "Loaded analytics data"
        );
        Ok(data)
    }

    /// Build the dashboard report
    pub async fn report(&self, cycle_id: Option<i64>, filter: AnalyticsFilter) -> AppResult<AnalyticsReport> {
        let data = self.load(cycle_id).await?;
        Ok(AnalyticsReport::build(
            filter,
            &data.cages,
            &data.production_logs,
            &data.feed_logs,
        ))
    }

    /// Export the loaded records with a summary block
    ///
    /// Returns the suggested file name with the document.
    pub async fn export(&self, cycle_id: Option<i64>, exported_at: DateTime<Utc>) -> AppResult<(String, AnalyticsExport)> {
        let data = self.load(cycle_id).await?;
        let summary = AnalyticsSummary {
            total_production: total_eggs(&data.production_logs),
            total_feed: total_feed(&data.feed_logs),
            avg_laying_rate: laying_rate_over_logs(&data.production_logs),
            export_date: exported_at,
        };
        let scope = data
            .cycle
            .as_ref()
            .map_or_else(|| "all-cycles".to_string(), Cycle::display_name);
        let file_name = export_file_name(&format!("analytics-export-{}", scope), exported_at.date_naive(), "json");

        tracing::info!(%file_name, "Exported analytics");
        Ok((file_name, AnalyticsExport { data, summary }))
    }
}
