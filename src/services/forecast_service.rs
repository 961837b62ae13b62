// src/services/forecast_service.rs

use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    ai::forecasting::{recommendations, run_forecast, ForecastSettings, GaussianJitter, NoJitter},
    common::error::AppError,
    db::{ForecastRepository, InventoryRepository},
    models::forecast::{ForecastRecord, ForecastReport},
};

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct ForecastService {
    inventory_repo: InventoryRepository,
    forecast_repo: ForecastRepository,
    settings: ForecastSettings,
    pool: PgPool,
}

impl ForecastService {
    pub fn new(
        inventory_repo: InventoryRepository,
        forecast_repo: ForecastRepository,
        settings: ForecastSettings,
        pool: PgPool,
    ) -> Self {
        Self { inventory_repo, forecast_repo, settings, pool }
    }

    pub async fn forecast_item(&self, item_id: Uuid, days: u32) -> Result<ForecastReport, AppError> {
        let item = self
            .inventory_repo
            .find_by_id(item_id)
            .await?
            .ok_or(AppError::ItemNotFound)?;

        let history = self.forecast_repo.demand_history(item_id).await?;
        let history_rows = history.len();
        let today = Utc::now().date_naive();
        let current_quantity = item.quantity;
        let settings = self.settings.clone();

        // The seasonal fit is CPU-bound; keep it off the async workers
        let (model_type, forecast) = tokio::task::spawn_blocking(move || {
            if settings.jitter {
                let mut jitter = GaussianJitter::new(StdRng::from_entropy());
                run_forecast(&history, current_quantity, days, today, &settings, &mut jitter)
            } else {
                run_forecast(&history, current_quantity, days, today, &settings, &mut NoJitter)
            }
        })
        .await
        .map_err(|e| anyhow::anyhow!("Forecast task failed: {}", e))?;

        let stored = self
            .forecast_repo
            .insert_run(&self.pool, item_id, model_type, &forecast)
            .await?;
        tracing::info!(
            "📈 Forecast for {} ({} history rows, {}): {} points stored",
            item.sku,
            history_rows,
            model_type,
            stored
        );

        let recommendations = recommendations(item.quantity, &forecast);

        Ok(ForecastReport {
            item_id: item.id,
            item_name: item.name,
            forecast_period: format!("{days} days"),
            model_type,
            forecast,
            current_stock: item.quantity,
            recommendations,
        })
    }

    /// Stored forecast records for an item, newest run first.
    pub async fn history(&self, item_id: Uuid, limit: Option<i64>) -> Result<Vec<ForecastRecord>, AppError> {
        if self.inventory_repo.find_by_id(item_id).await?.is_none() {
            return Err(AppError::ItemNotFound);
        }
        self.forecast_repo.history(item_id, history_limit(limit)).await
    }
}

pub fn history_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT)
}
