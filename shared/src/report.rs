//! Analytics report
//!
//! Builds the analytics dashboard payload (KPIs, charts, ranked cage table and
//! insights) from already-loaded cages and logs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::chart::{colors, ChartData, Dataset};
use crate::insights::{generate_insights, Insight};
use crate::metrics::{
    feed_efficiency, group_by_period, laying_rate_over_logs, mean, moving_average,
    performance_score, total_eggs, total_feed, Granularity,
};
use crate::models::{Cage, FeedLog, ProductionLog};
use crate::types::DateRange;
use crate::units::{Eggs, FeedKg, Grams};

/// Logs shown on the efficiency chart
pub const EFFICIENCY_CHART_LOGS: usize = 30;
/// Moving-average window on the efficiency chart
pub const EFFICIENCY_AVERAGE_WINDOW: usize = 7;

/// Report filter: date range, optional cage, and the day the range ends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsFilter {
    pub range: DateRange,
    pub cage_id: Option<i64>,
    pub as_of: NaiveDate,
}

impl AnalyticsFilter {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            range: DateRange::default(),
            cage_id: None,
            as_of,
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_cage(mut self, cage_id: Option<i64>) -> Self {
        self.cage_id = cage_id;
        self
    }

    fn keeps(&self, date: NaiveDate, cage_id: Option<i64>) -> bool {
        if !self.range.contains(date, self.as_of) {
            return false;
        }
        match self.cage_id {
            Some(wanted) => cage_id == Some(wanted),
            None => true,
        }
    }

    pub fn production_logs<'a>(&self, logs: &'a [ProductionLog]) -> Vec<&'a ProductionLog> {
        logs.iter()
            .filter(|log| self.keeps(log.date, Some(log.cage_id)))
            .collect()
    }

    pub fn feed_logs<'a>(&self, logs: &'a [FeedLog]) -> Vec<&'a FeedLog> {
        logs.iter()
            .filter(|log| self.keeps(log.date, log.cage_id))
            .collect()
    }
}

/// Headline figures for the filtered period
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_production: Eggs,
    /// Eggs per bird-day, as a percentage
    pub avg_laying_rate: f64,
    /// Eggs per kg of feed
    pub feed_efficiency: f64,
    /// Mean over logs that record an egg weight
    pub avg_egg_weight: Grams,
}

/// One row of the cage ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CagePerformance {
    pub cage_id: i64,
    pub cage_name: String,
    pub current_birds: u32,
    pub total_eggs: Eggs,
    pub total_feed: FeedKg,
    pub laying_rate: f64,
    pub feed_efficiency: f64,
    pub performance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportCharts {
    pub production_trend: ChartData,
    pub cage_performance: ChartData,
    pub feed: ChartData,
    pub efficiency: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub filter: AnalyticsFilter,
    pub kpis: Kpis,
    pub charts: ReportCharts,
    /// Best performer first
    pub performance: Vec<CagePerformance>,
    pub insights: Vec<Insight>,
}

impl AnalyticsReport {
    /// Build the full report
    ///
    /// KPIs and time charts use the filtered logs. Cage rankings and insights
    /// look at everything loaded, so a short date range does not hide a cage.
    pub fn build(
        filter: AnalyticsFilter,
        cages: &[Cage],
        production_logs: &[ProductionLog],
        feed_logs: &[FeedLog],
    ) -> Self {
        let logs = filter.production_logs(production_logs);
        let feed = filter.feed_logs(feed_logs);

        let performance = cage_performance(cages, production_logs, feed_logs);
        let charts = ReportCharts {
            production_trend: production_trend_chart(&logs),
            cage_performance: cage_performance_chart(&performance),
            feed: feed_chart(&feed),
            efficiency: efficiency_chart(&logs, feed_logs),
        };

        Self {
            filter,
            kpis: kpis(&logs, &feed),
            charts,
            performance,
            insights: generate_insights(cages, production_logs, feed_logs),
        }
    }
}

pub fn kpis(logs: &[&ProductionLog], feed_logs: &[&FeedLog]) -> Kpis {
    let total_production = total_eggs(logs.iter().copied());
    let feed = total_feed(feed_logs.iter().copied());
    let weights: Vec<f64> = logs
        .iter()
        .filter_map(|log| log.avg_egg_weight)
        .map(|grams| grams.value())
        .filter(|grams| *grams > 0.0)
        .collect();

    Kpis {
        total_production,
        avg_laying_rate: laying_rate_over_logs(logs.iter().copied()),
        feed_efficiency: feed_efficiency(total_production, feed),
        avg_egg_weight: Grams(mean(&weights)),
    }
}

/// Rank cages by the composite performance score, best first
pub fn cage_performance(
    cages: &[Cage],
    production_logs: &[ProductionLog],
    feed_logs: &[FeedLog],
) -> Vec<CagePerformance> {
    let mut rows: Vec<CagePerformance> = cages
        .iter()
        .map(|cage| {
            let logs: Vec<&ProductionLog> = production_logs
                .iter()
                .filter(|log| log.cage_id == cage.id)
                .collect();
            let eggs = total_eggs(logs.iter().copied());
            let feed = total_feed(feed_logs.iter().filter(|log| log.cage_id == Some(cage.id)));
            let laying_rate = laying_rate_over_logs(logs.iter().copied());
            let efficiency = feed_efficiency(eggs, feed);

            CagePerformance {
                cage_id: cage.id,
                cage_name: cage.name.clone(),
                current_birds: cage.current_birds,
                total_eggs: eggs,
                total_feed: feed,
                laying_rate,
                feed_efficiency: efficiency,
                performance_score: performance_score(laying_rate, efficiency),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.performance_score.total_cmp(&a.performance_score));
    rows
}

/// Weekly eggs with the week's laying rate over bird-days
pub fn production_trend_chart(logs: &[&ProductionLog]) -> ChartData {
    let weeks = group_by_period(logs, Granularity::Week);

    let labels = weeks.keys().map(NaiveDate::to_string).collect();
    let production = weeks
        .values()
        .map(|week| total_eggs(week.iter().map(|log| **log)).value())
        .collect();
    let laying = weeks
        .values()
        .map(|week| laying_rate_over_logs(week.iter().map(|log| **log)))
        .collect();

    ChartData::new(labels)
        .with_dataset(Dataset::new("Weekly Production", production, colors::BLUE).filled())
        .with_dataset(Dataset::new("Laying Rate %", laying, colors::GREEN))
}

pub fn cage_performance_chart(performance: &[CagePerformance]) -> ChartData {
    let mut ranked: Vec<&CagePerformance> = performance.iter().collect();
    ranked.sort_by(|a, b| b.laying_rate.total_cmp(&a.laying_rate));

    ChartData::new(ranked.iter().map(|row| row.cage_name.clone()).collect()).with_dataset(
        Dataset::new(
            "Laying Rate %",
            ranked.iter().map(|row| row.laying_rate).collect(),
            colors::PURPLE,
        ),
    )
}

pub fn feed_chart(feed_logs: &[&FeedLog]) -> ChartData {
    let weeks = group_by_period(feed_logs, Granularity::Week);

    ChartData::new(weeks.keys().map(NaiveDate::to_string).collect()).with_dataset(Dataset::new(
        "Weekly Feed (kg)",
        weeks
            .values()
            .map(|week| total_feed(week.iter().map(|log| **log)).value())
            .collect(),
        colors::AMBER,
    ))
}

/// Daily eggs per kg for the latest logs, trimmed to align with its moving average
pub fn efficiency_chart(logs: &[&ProductionLog], feed_logs: &[FeedLog]) -> ChartData {
    let mut ordered: Vec<&ProductionLog> = logs.to_vec();
    ordered.sort_by_key(|log| log.date);
    let recent = &ordered[ordered.len().saturating_sub(EFFICIENCY_CHART_LOGS)..];

    let daily: Vec<f64> = recent
        .iter()
        .map(|log| {
            let feed = total_feed(
                feed_logs
                    .iter()
                    .filter(|f| f.date == log.date && f.cage_id == Some(log.cage_id)),
            );
            feed_efficiency(log.eggs(), feed)
        })
        .collect();

    // The window is a non-zero constant
    let averaged = moving_average(&daily, EFFICIENCY_AVERAGE_WINDOW).unwrap_or_default();
    let skip = daily.len() - averaged.len();

    ChartData::new(recent[skip..].iter().map(|log| log.date.to_string()).collect())
        .with_dataset(Dataset::new("Daily Efficiency", daily[skip..].to_vec(), colors::CYAN))
        .with_dataset(Dataset::new("7-Day Average", averaged, colors::RED))
}
