//! Chart payloads handed to the page's chart renderer

use serde::{Deserialize, Serialize};

/// Labeled series ready for drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub color: String,
    #[serde(default)]
    pub fill: bool,
}

impl Dataset {
    pub fn new(label: impl Into<String>, data: Vec<f64>, color: &str) -> Self {
        Self {
            label: label.into(),
            data,
            color: color.to_string(),
            fill: false,
        }
    }

    pub fn filled(mut self) -> Self {
        self.fill = true;
        self
    }
}

impl ChartData {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            datasets: Vec::new(),
        }
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.datasets.push(dataset);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Palette shared by the dashboards
pub mod colors {
    pub const BLUE: &str = "#2563eb";
    pub const GREEN: &str = "#10b981";
    pub const PURPLE: &str = "#8b5cf6";
    pub const AMBER: &str = "#f59e0b";
    pub const CYAN: &str = "#06b6d4";
    pub const RED: &str = "#ef4444";
}
