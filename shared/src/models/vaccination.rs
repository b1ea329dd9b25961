//! Vaccination models and the standard layer schedule

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::impl_record;
use super::Collection;

/// A vaccination administered to a cycle's flock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vaccination {
    #[serde(default)]
    pub id: i64,
    pub cycle_id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub flock_age: u32,
    pub vaccine_name: String,
    #[serde(default)]
    pub administration_method: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub birds_treated: u32,
    #[serde(default)]
    pub batch_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub veterinarian: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(Vaccination, Collection::Vaccinations);

/// Vaccination form input; flock age is derived from the cycle start
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationInput {
    pub cycle_id: i64,
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 200))]
    pub vaccine_name: String,
    #[validate(length(min = 1))]
    pub administration_method: String,
    #[serde(default)]
    pub dosage: String,
    #[validate(range(min = 1))]
    pub birds_treated: u32,
    #[serde(default)]
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub veterinarian: String,
    #[serde(default)]
    pub notes: String,
}

/// One entry of the recommended schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledVaccine {
    pub day: u32,
    pub weeks: u32,
    pub vaccine: &'static str,
    pub method: &'static str,
}

/// Recommended vaccination programme for commercial layers
pub const STANDARD_SCHEDULE: [ScheduledVaccine; 9] = [
    ScheduledVaccine { day: 1, weeks: 0, vaccine: "Marek's Disease", method: "injection" },
    ScheduledVaccine { day: 7, weeks: 1, vaccine: "Newcastle + IB", method: "spray" },
    ScheduledVaccine { day: 14, weeks: 2, vaccine: "Gumboro (IBD)", method: "drinking_water" },
    ScheduledVaccine { day: 21, weeks: 3, vaccine: "Newcastle + IB", method: "drinking_water" },
    ScheduledVaccine { day: 28, weeks: 4, vaccine: "Gumboro (IBD)", method: "drinking_water" },
    ScheduledVaccine { day: 35, weeks: 5, vaccine: "Newcastle", method: "drinking_water" },
    ScheduledVaccine { day: 63, weeks: 9, vaccine: "Fowl Pox", method: "wing_web" },
    ScheduledVaccine { day: 105, weeks: 15, vaccine: "Newcastle + IB", method: "injection" },
    ScheduledVaccine { day: 119, weeks: 17, vaccine: "Egg Drop Syndrome", method: "injection" },
];

/// Days either side of the scheduled age that still count as on schedule
pub const SCHEDULE_TOLERANCE_DAYS: u32 = 3;

/// Schedule entry with its completion state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub day: u32,
    pub weeks: u32,
    pub vaccine: String,
    pub method: String,
    pub completed: bool,
}

/// Mark each standard schedule entry done when a recorded vaccination matches it
pub fn vaccination_schedule(vaccinations: &[Vaccination]) -> Vec<ScheduleItem> {
    STANDARD_SCHEDULE
        .iter()
        .map(|item| {
            let wanted = item.vaccine.to_lowercase();
            let completed = vaccinations.iter().any(|v| {
                v.vaccine_name.to_lowercase().contains(&wanted)
                    && v.flock_age.abs_diff(item.day) <= SCHEDULE_TOLERANCE_DAYS
            });
            ScheduleItem {
                day: item.day,
                weeks: item.weeks,
                vaccine: item.vaccine.to_string(),
                method: item.method.to_string(),
                completed,
            }
        })
        .collect()
}
