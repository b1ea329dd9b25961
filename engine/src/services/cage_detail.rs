//! Cage detail view: one cage with its history and derived metrics

use std::sync::Arc;

use serde::Serialize;

use shared::chart::ChartData;
use shared::lifecycle::{self, CageMetrics, PerformanceLevel};
use shared::models::{Cage, Cycle, FeedLog, ProductionLog};

use crate::error::{AppError, AppResult};
use crate::storage::{Repository, Store};

#[derive(Clone)]
pub struct CageDetailService {
    repo: Repository,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CageDetail {
    pub cage: Cage,
    pub cycle: Option<Cycle>,
    /// Newest first
    pub production_logs: Vec<ProductionLog>,
    /// Newest first
    pub feed_logs: Vec<FeedLog>,
    pub metrics: CageMetrics,
    pub production_chart: ChartData,
    pub mean_laying_rate: f64,
    pub performance: PerformanceLevel,
}

impl CageDetailService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Load a cage with everything its detail page shows
    pub async fn load(&self, cage_id: i64) -> AppResult<CageDetail> {
        let cage = self
            .repo
            .get::<Cage>(cage_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cage", cage_id))?;
        let cycle = self.repo.get::<Cycle>(cage.cycle_id).await?;
        let mut production_logs: Vec<ProductionLog> = self.repo.by_index("cageId", cage.id).await?;
        let mut feed_logs: Vec<FeedLog> = self.repo.by_index("cageId", cage.id).await?;

        let cycle_start = cycle.as_ref().map(|cycle| cycle.start_date);
        let metrics = lifecycle::cage_metrics(&cage, cycle_start, &production_logs, &feed_logs);
        let production_chart = lifecycle::cage_production_chart(&cage, &production_logs);
        let mean_laying_rate = lifecycle::mean_daily_laying_rate(&cage, &production_logs);

        production_logs.sort_by(|a, b| b.date.cmp(&a.date));
        feed_logs.sort_by(|a, b| b.date.cmp(&a.date));

        tracing::debug!(cage_id, logs = production_logs.len(), "Loaded cage detail");

        Ok(CageDetail {
            cage,
            cycle,
            production_logs,
            feed_logs,
            metrics,
            production_chart,
            mean_laying_rate,
            performance: PerformanceLevel::from_laying_rate(mean_laying_rate),
        })
    }
}
