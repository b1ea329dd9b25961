//! Cage models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::impl_record;
use super::Collection;

/// A housed group of birds within a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cage {
    #[serde(default)]
    pub id: i64,
    pub cycle_id: i64,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    /// Running stock; rewritten with the closing count after every daily log
    #[serde(default)]
    pub current_birds: u32,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub status: CageStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(Cage, Collection::Cages);

/// Cage operating status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CageStatus {
    #[default]
    Active,
    Maintenance,
    Inactive,
    Cleaning,
}

impl Cage {
    pub fn new(cycle_id: i64, name: impl Into<String>, capacity: u32, current_birds: u32) -> Self {
        Self {
            id: 0,
            cycle_id,
            name: name.into(),
            capacity,
            current_birds,
            breed: String::new(),
            status: CageStatus::Active,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Stocking density as a percentage of capacity
    pub fn occupancy_percent(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            f64::from(self.current_birds) / f64::from(self.capacity) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy() {
        let cage = Cage::new(1, "Cage A1", 500, 400);
        assert!((cage.occupancy_percent() - 80.0).abs() < 1e-9);

        let empty = Cage::new(1, "Cage A2", 0, 10);
        assert_eq!(empty.occupancy_percent(), 0.0);
    }

    #[test]
    fn test_deserialize_minimal() {
        let cage: Cage =
            serde_json::from_str(r#"{"id":3,"cycleId":1,"name":"Cage B"}"#).unwrap();
        assert_eq!(cage.id, 3);
        assert_eq!(cage.current_birds, 0);
        assert_eq!(cage.status, CageStatus::Active);
    }
}
