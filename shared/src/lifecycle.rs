//! Cage lifecycle calculations
//!
//! Derives the running state of one cage from its time-ordered production logs:
//! flock age, bird balance, mortality, production and feed ratios.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::chart::{colors, ChartData, Dataset};
use crate::metrics::{laying_percentage, mean, total_feed};
use crate::models::{flock_age_days, Cage, FeedLog, ProductionLog};
use crate::units::{Eggs, FeedKg, Grams, Trays};

/// Flock age at onset of lay (19 weeks)
pub const LAYING_ONSET_DAYS: u32 = 133;

/// Logs shown on the cage production chart
pub const CAGE_CHART_DAYS: usize = 30;

/// Snapshot of a cage's derived metrics
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CageMetrics {
    pub age_in_days: u32,
    pub age_in_weeks: u32,
    pub closing_birds: u32,
    pub cumulative_mortality: u32,
    pub cumulative_mortality_percent: f64,
    pub cumulative_production_trays: Trays,
    pub cumulative_production_eggs: Eggs,
    pub current_production_percent: f64,
    /// Eggs per bird from onset of lay
    pub hen_house_production: f64,
    pub current_feed_per_bird: FeedKg,
    pub cumulative_feed_per_bird: FeedKg,
    pub current_feed_per_egg: Grams,
    pub cumulative_feed_per_egg: Grams,
}

/// Qualitative band for a cage's mean daily laying rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    BelowAverage,
}

impl PerformanceLevel {
    pub fn from_laying_rate(rate: f64) -> Self {
        if rate > 80.0 {
            PerformanceLevel::Excellent
        } else if rate > 60.0 {
            PerformanceLevel::Good
        } else if rate > 40.0 {
            PerformanceLevel::Average
        } else {
            PerformanceLevel::BelowAverage
        }
    }
}

impl std::fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerformanceLevel::Excellent => write!(f, "Excellent"),
            PerformanceLevel::Good => write!(f, "Good"),
            PerformanceLevel::Average => write!(f, "Average"),
            PerformanceLevel::BelowAverage => write!(f, "Below Average"),
        }
    }
}

/// Flock age of a log: the recorded value, else derived from the cycle start
pub fn effective_flock_age(log: &ProductionLog, cycle_start: Option<NaiveDate>) -> u32 {
    match (log.flock_age.filter(|age| *age > 0), cycle_start) {
        (Some(age), _) => age,
        (None, Some(start)) => flock_age_days(start, log.date),
        (None, None) => 0,
    }
}

/// Opening birds for a new day's entry
///
/// Chains from the previous day's closing count so the bird balance carries
/// over; with no entry for the previous day the cage's stored count is used.
pub fn opening_birds_for(cage: &Cage, logs: &[ProductionLog], date: NaiveDate) -> u32 {
    let previous_day = date - Duration::days(1);
    logs.iter()
        .find(|log| log.cage_id == cage.id && log.date == previous_day)
        .map(|log| log.closing_birds)
        .unwrap_or(cage.current_birds)
}

/// Compute the metrics snapshot for a cage
///
/// `logs` may arrive in any order; they are evaluated oldest first.
pub fn cage_metrics(
    cage: &Cage,
    cycle_start: Option<NaiveDate>,
    logs: &[ProductionLog],
    feed_logs: &[FeedLog],
) -> CageMetrics {
    let mut ordered: Vec<&ProductionLog> = logs.iter().collect();
    ordered.sort_by_key(|log| log.date);

    let (Some(first), Some(latest)) = (ordered.first(), ordered.last()) else {
        return CageMetrics {
            closing_birds: cage.current_birds,
            ..CageMetrics::default()
        };
    };

    let age_in_days = match latest.flock_age.filter(|age| *age > 0) {
        Some(age) => age,
        None => cycle_start.map_or(1, |start| flock_age_days(start, latest.date)),
    };

    let cumulative_mortality: u32 = ordered.iter().map(|log| log.mortality).sum();
    let initial_birds = if first.opening_birds > 0 {
        first.opening_birds
    } else {
        cage.current_birds
    };
    let cumulative_mortality_percent = if initial_birds > 0 {
        f64::from(cumulative_mortality) / f64::from(initial_birds) * 100.0
    } else {
        0.0
    };

    let cumulative_production_trays: Trays = ordered.iter().map(|log| log.trays()).sum();
    let cumulative_production_eggs: Eggs = ordered.iter().map(|log| log.eggs()).sum();

    let latest_eggs = latest.eggs();
    let latest_opening = f64::from(latest.opening_birds);
    let current_production_percent = laying_percentage(latest_eggs, latest_opening, 1);

    let laying_logs: Vec<&&ProductionLog> = ordered
        .iter()
        .filter(|log| effective_flock_age(log, cycle_start) >= LAYING_ONSET_DAYS)
        .collect();
    let laying_eggs: Eggs = laying_logs.iter().map(|log| log.eggs()).sum();
    let laying_birds: Vec<f64> = laying_logs
        .iter()
        .map(|log| f64::from(log.opening_birds))
        .collect();
    let avg_laying_birds = mean(&laying_birds);
    let hen_house_production = if avg_laying_birds > 0.0 {
        laying_eggs.value() / avg_laying_birds
    } else {
        0.0
    };

    let cumulative_feed = total_feed(feed_logs);
    let latest_feed = latest.feed();
    let current_feed_per_bird = if latest_opening > 0.0 {
        FeedKg(latest_feed.value() / latest_opening)
    } else {
        FeedKg::ZERO
    };
    let cumulative_feed_per_bird = if avg_laying_birds > 0.0 {
        FeedKg(cumulative_feed.value() / avg_laying_birds)
    } else {
        FeedKg::ZERO
    };

    CageMetrics {
        age_in_days,
        age_in_weeks: age_in_days / 7,
        closing_birds: latest.closing_birds,
        cumulative_mortality,
        cumulative_mortality_percent,
        cumulative_production_trays,
        cumulative_production_eggs,
        current_production_percent,
        hen_house_production,
        current_feed_per_bird,
        cumulative_feed_per_bird,
        current_feed_per_egg: latest_feed.grams_per_egg(latest_eggs),
        cumulative_feed_per_egg: cumulative_feed.grams_per_egg(cumulative_production_eggs),
    }
}

/// Day's laying rate, using the cage stock when the log has no opening count
pub fn daily_laying_rate(cage: &Cage, log: &ProductionLog) -> f64 {
    let birds = if log.opening_birds > 0 {
        log.opening_birds
    } else {
        cage.current_birds
    };
    laying_percentage(log.eggs(), f64::from(birds), 1)
}

/// Mean of the daily laying rates over all logs
pub fn mean_daily_laying_rate(cage: &Cage, logs: &[ProductionLog]) -> f64 {
    let rates: Vec<f64> = logs.iter().map(|log| daily_laying_rate(cage, log)).collect();
    mean(&rates)
}

/// Eggs and laying rate for the most recent days, oldest first
pub fn cage_production_chart(cage: &Cage, logs: &[ProductionLog]) -> ChartData {
    let mut ordered: Vec<&ProductionLog> = logs.iter().collect();
    ordered.sort_by_key(|log| log.date);
    let recent = &ordered[ordered.len().saturating_sub(CAGE_CHART_DAYS)..];

    let labels = recent.iter().map(|log| log.date.to_string()).collect();
    let eggs = recent.iter().map(|log| log.eggs().value()).collect();
    let rates = recent
        .iter()
        .map(|log| daily_laying_rate(cage, log))
        .collect();

    ChartData::new(labels)
        .with_dataset(Dataset::new("Eggs Collected", eggs, colors::BLUE).filled())
        .with_dataset(Dataset::new("Laying %", rates, colors::GREEN))
}
