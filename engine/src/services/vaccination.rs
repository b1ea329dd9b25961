//! Vaccination records and the standard schedule

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use shared::models::{vaccination_schedule, Cycle, ScheduleItem, Vaccination, VaccinationInput};

use crate::error::{AppError, AppResult};
use crate::storage::{Repository, Store};

#[derive(Clone)]
pub struct VaccinationService {
    repo: Repository,
}

impl VaccinationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    async fn load_cycle(&self, cycle_id: i64) -> AppResult<Cycle> {
        self.repo
            .get::<Cycle>(cycle_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cycle", cycle_id))
    }

    /// Record a vaccination; flock age is taken from the cycle start
    pub async fn record(&self, input: VaccinationInput) -> AppResult<Vaccination> {
        input.validate()?;
        let cycle = self.load_cycle(input.cycle_id).await?;
        let now = Utc::now();

        let mut vaccination = Vaccination {
            id: 0,
            cycle_id: cycle.id,
            date: input.date,
            flock_age: cycle.flock_age_on(input.date),
            vaccine_name: input.vaccine_name,
            administration_method: input.administration_method,
            dosage: input.dosage,
            birds_treated: input.birds_treated,
            batch_number: input.batch_number,
            expiry_date: input.expiry_date,
            manufacturer: input.manufacturer,
            veterinarian: input.veterinarian,
            notes: input.notes,
            created_at: Some(now),
            updated_at: Some(now),
        };
        if let Err(e) = self.repo.add(&mut vaccination).await {
            tracing::error!(cycle_id = cycle.id, error = %e, "Failed to record vaccination");
            return Err(e.into());
        }
        tracing::info!(
            vaccination_id = vaccination.id,
            vaccine = %vaccination.vaccine_name,
            flock_age = vaccination.flock_age,
            "Recorded vaccination"
        );
        Ok(vaccination)
    }

    /// Vaccinations of a cycle, newest first
    pub async fn list(&self, cycle_id: i64) -> AppResult<Vec<Vaccination>> {
        let mut vaccinations: Vec<Vaccination> = self.repo.by_index("cycleId", cycle_id).await?;
        vaccinations.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(vaccinations)
    }

    pub async fn delete(&self, vaccination_id: i64) -> AppResult<()> {
        if self.repo.get::<Vaccination>(vaccination_id).await?.is_none() {
            return Err(AppError::not_found("Vaccination", vaccination_id));
        }
        self.repo.delete::<Vaccination>(vaccination_id).await?;
        tracing::info!(vaccination_id, "Deleted vaccination");
        Ok(())
    }

    /// Standard schedule with each entry marked done or pending for the cycle
    pub async fn schedule(&self, cycle_id: i64) -> AppResult<Vec<ScheduleItem>> {
        self.load_cycle(cycle_id).await?;
        let vaccinations = self.list(cycle_id).await?;
        Ok(vaccination_schedule(&vaccinations))
    }
}
