//! Production metrics
//!
//! Pure functions over daily logs. Degenerate input (no birds, no feed, empty
//! series) yields zero or an empty result instead of an error; the only
//! rejected input is a moving-average window of zero.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Expense, FeedLog, ProductionLog, Sale, Vaccination};
use crate::units::{Eggs, FeedKg};

/// Weight of the laying rate in the composite performance score
pub const SCORE_LAYING_WEIGHT: f64 = 0.6;
/// Weight of the scaled feed efficiency in the composite performance score
pub const SCORE_FEED_WEIGHT: f64 = 0.4;
/// Feed efficiency is multiplied by this before weighting
pub const SCORE_FEED_SCALE: f64 = 10.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("Moving average window must be at least 1")]
    InvalidWindow,
}

/// Anything that happened on a calendar day
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

macro_rules! impl_dated {
    ($($ty:ty),*) => {
        $(
            impl Dated for $ty {
                fn date(&self) -> NaiveDate {
                    self.date
                }
            }
        )*
    };
}

impl_dated!(ProductionLog, FeedLog, Sale, Expense, Vaccination);

impl<T: Dated> Dated for &T {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }
}

impl Dated for NaiveDate {
    fn date(&self) -> NaiveDate {
        *self
    }
}

/// Eggs as a percentage of bird-days
pub fn laying_percentage(eggs: Eggs, birds: f64, days: u32) -> f64 {
    if birds <= 0.0 || days == 0 {
        return 0.0;
    }
    eggs.value() / (birds * f64::from(days)) * 100.0
}

/// Eggs produced per kilogram of feed
pub fn feed_efficiency(eggs: Eggs, feed: FeedKg) -> f64 {
    if feed.value() > 0.0 {
        eggs.value() / feed.value()
    } else {
        0.0
    }
}

/// Ranking score combining laying rate and feed efficiency; display only
pub fn performance_score(laying_rate: f64, feed_efficiency: f64) -> f64 {
    laying_rate * SCORE_LAYING_WEIGHT + (feed_efficiency * SCORE_FEED_SCALE) * SCORE_FEED_WEIGHT
}

/// Trailing mean over `window` values; output is `window - 1` shorter than the input
pub fn moving_average(series: &[f64], window: usize) -> Result<Vec<f64>, MetricsError> {
    if window == 0 {
        return Err(MetricsError::InvalidWindow);
    }
    Ok(series
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect())
}

/// Arithmetic mean, zero for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Period length used to bucket logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    /// ISO week, starting Monday
    #[default]
    Week,
    Month,
    Year,
}

/// First day of the period containing `date`
pub fn period_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
        Granularity::Month => date.with_day(1).unwrap_or(date),
        Granularity::Year => date.with_ordinal(1).unwrap_or(date),
    }
}

/// Bucket items by the start date of their period
///
/// Keys serialise as ISO dates. Within a bucket items keep their input order.
pub fn group_by_period<T: Dated>(items: &[T], granularity: Granularity) -> BTreeMap<NaiveDate, Vec<&T>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&T>> = BTreeMap::new();
    for item in items {
        groups
            .entry(period_start(item.date(), granularity))
            .or_default()
            .push(item);
    }
    groups
}

/// Sum of normalised eggs over logs
pub fn total_eggs<'a>(logs: impl IntoIterator<Item = &'a ProductionLog>) -> Eggs {
    logs.into_iter().map(ProductionLog::eggs).sum()
}

/// Sum of feed over feed logs
pub fn total_feed<'a>(logs: impl IntoIterator<Item = &'a FeedLog>) -> FeedKg {
    logs.into_iter().map(|log| log.amount).sum()
}

/// Laying rate over the bird-days the logs cover
///
/// Each log contributes its opening birds as one bird-day count.
pub fn laying_rate_over_logs<'a>(logs: impl IntoIterator<Item = &'a ProductionLog>) -> f64 {
    let (eggs, bird_days) = logs.into_iter().fold((Eggs::ZERO, 0.0), |(eggs, birds), log| {
        (eggs + log.eggs(), birds + f64::from(log.opening_birds))
    });
    laying_percentage(eggs, bird_days, 1)
}
