//! Rule-based insights over aggregate production metrics

use serde::Serialize;

use crate::metrics::{feed_efficiency, laying_rate_over_logs, mean, total_eggs, total_feed};
use crate::models::{Cage, FeedLog, ProductionLog};

/// Insights shown at once; later rules are dropped first
pub const MAX_INSIGHTS: usize = 4;

pub const EXCELLENT_LAYING_RATE: f64 = 85.0;
pub const BELOW_AVERAGE_LAYING_RATE: f64 = 60.0;
/// Eggs per kg of feed under which feed use is flagged
pub const LOW_FEED_EFFICIENCY: f64 = 0.5;
/// Logs per trend window
pub const TREND_WINDOW: usize = 7;
/// Relative change between trend windows that counts as a trend
pub const TREND_THRESHOLD: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Success,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: &'static str,
    pub description: &'static str,
}

const EXCELLENT: Insight = Insight {
    kind: InsightKind::Success,
    title: "Excellent Performance",
    description: "Your laying rate is above 85%, indicating excellent flock health and management.",
};

const BELOW_AVERAGE: Insight = Insight {
    kind: InsightKind::Warning,
    title: "Below Average Performance",
    description: "Consider reviewing feeding schedules, health management, or environmental conditions.",
};

const FEED_ALERT: Insight = Insight {
    kind: InsightKind::Info,
    title: "Feed Efficiency Alert",
    description: "Feed conversion ratio could be improved. Consider adjusting feed quality or quantity.",
};

const INCREASING: Insight = Insight {
    kind: InsightKind::Success,
    title: "Production Increasing",
    description: "Production has increased by more than 10% compared to the previous week.",
};

const DECLINING: Insight = Insight {
    kind: InsightKind::Warning,
    title: "Production Declining",
    description: "Production has decreased by more than 10% compared to the previous week.",
};

/// Production trend between the two most recent windows of logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Declining,
    Steady,
}

/// Compare mean daily eggs of the latest window against the one before it
///
/// Returns `None` unless both windows hold at least one log.
pub fn production_trend(logs: &[ProductionLog]) -> Option<Trend> {
    let mut ordered: Vec<&ProductionLog> = logs.iter().collect();
    ordered.sort_by_key(|log| log.date);

    let split = ordered.len().saturating_sub(TREND_WINDOW);
    let (earlier, recent) = ordered.split_at(split);
    let previous = &earlier[earlier.len().saturating_sub(TREND_WINDOW)..];
    if recent.is_empty() || previous.is_empty() {
        return None;
    }

    let daily = |window: &[&ProductionLog]| -> f64 {
        let eggs: Vec<f64> = window.iter().map(|log| log.eggs().value()).collect();
        mean(&eggs)
    };
    let recent_avg = daily(recent);
    let previous_avg = daily(previous);

    Some(if recent_avg > previous_avg * (1.0 + TREND_THRESHOLD) {
        Trend::Increasing
    } else if recent_avg < previous_avg * (1.0 - TREND_THRESHOLD) {
        Trend::Declining
    } else {
        Trend::Steady
    })
}

/// Evaluate the insight rules in their fixed order
///
/// With no cages or no logs there is nothing to judge and the list is empty.
pub fn generate_insights(cages: &[Cage], logs: &[ProductionLog], feed_logs: &[FeedLog]) -> Vec<Insight> {
    let mut insights = Vec::new();
    if cages.is_empty() || logs.is_empty() {
        return insights;
    }

    let laying_rate = laying_rate_over_logs(logs);
    if laying_rate > EXCELLENT_LAYING_RATE {
        insights.push(EXCELLENT);
    } else if laying_rate < BELOW_AVERAGE_LAYING_RATE {
        insights.push(BELOW_AVERAGE);
    }

    // Efficiency is 0 without recorded feed, which also raises the alert
    if feed_efficiency(total_eggs(logs), total_feed(feed_logs)) < LOW_FEED_EFFICIENCY {
        insights.push(FEED_ALERT);
    }

    match production_trend(logs) {
        Some(Trend::Increasing) => insights.push(INCREASING),
        Some(Trend::Declining) => insights.push(DECLINING),
        Some(Trend::Steady) | None => {}
    }

    // At most three rules fire today; the cap keeps earlier rules if more are added
    insights.truncate(MAX_INSIGHTS);
    insights
}
