//! Egg and bird sales for a cycle

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use validator::Validate;

use shared::models::{Cycle, Sale, SaleInput};
use shared::units::Eggs;
use shared::validation::validate_sale_quantities;

use crate::error::{AppError, AppResult};
use crate::storage::{Repository, Store};

#[derive(Clone)]
pub struct SalesService {
    repo: Repository,
}

/// Totals over a cycle's sales
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_amount: Decimal,
    pub total_crates: Decimal,
    pub total_eggs_sold: Eggs,
    /// Egg revenue over crates sold; zero with no crates
    pub avg_price_per_crate: Decimal,
}

impl SalesSummary {
    pub fn from_sales(sales: &[Sale]) -> Self {
        let total_amount: Decimal = sales.iter().map(|sale| sale.amount).sum();
        let total_crates: Decimal = sales.iter().map(|sale| sale.crates).sum();
        let egg_revenue: Decimal = sales
            .iter()
            .filter(|sale| sale.crates > Decimal::ZERO)
            .map(|sale| sale.amount)
            .sum();
        let avg_price_per_crate = if total_crates > Decimal::ZERO {
            (egg_revenue / total_crates).round_dp(2)
        } else {
            Decimal::ZERO
        };
        Self {
            total_amount,
            total_crates,
            total_eggs_sold: sales.iter().map(Sale::eggs_sold).sum(),
            avg_price_per_crate,
        }
    }
}

impl SalesService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Record a sale; the amount is computed from its quantities
    pub async fn record_sale(&self, input: SaleInput) -> AppResult<Sale> {
        input.validate()?;
        validate_sale_quantities(&input).map_err(|msg| AppError::ValidationError(msg.to_string()))?;
        if self.repo.get::<Cycle>(input.cycle_id).await?.is_none() {
            return Err(AppError::not_found("Cycle", input.cycle_id));
        }

        let mut sale = Sale {
            id: 0,
            cycle_id: input.cycle_id,
            date: input.date,
            sale_type: input.sale_type,
            customer: input.customer,
            crates: input.crates,
            price_per_crate: input.price_per_crate,
            bird_quantity: input.bird_quantity,
            price_per_bird: input.price_per_bird,
            weight_kg: input.weight_kg,
            amount: Decimal::ZERO,
            payment_method: input.payment_method,
            notes: input.notes,
            created_at: Some(Utc::now()),
        };
        sale.amount = sale.computed_amount();

        if let Err(e) = self.repo.add(&mut sale).await {
            tracing::error!(cycle_id = sale.cycle_id, error = %e, "Failed to record sale");
            return Err(e.into());
        }
        tracing::info!(sale_id = sale.id, amount = %sale.amount, "Recorded sale");
        Ok(sale)
    }

    /// Sales of a cycle, newest first
    pub async fn list_sales(&self, cycle_id: i64) -> AppResult<Vec<Sale>> {
        let mut sales: Vec<Sale> = self.repo.by_index("cycleId", cycle_id).await?;
        sales.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sales)
    }

    pub async fn delete_sale(&self, sale_id: i64) -> AppResult<()> {
        if self.repo.get::<Sale>(sale_id).await?.is_none() {
            return Err(AppError::not_found("Sale", sale_id));
        }
        self.repo.delete::<Sale>(sale_id).await?;
        tracing::info!(sale_id, "Deleted sale");
        Ok(())
    }

    pub async fn summary(&self, cycle_id: i64) -> AppResult<SalesSummary> {
        let sales = self.list_sales(cycle_id).await?;
        Ok(SalesSummary::from_sales(&sales))
    }
}
