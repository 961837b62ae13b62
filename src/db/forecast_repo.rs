// src/db/forecast_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::forecast::{DemandObservation, ForecastPoint, ForecastRecord, ModelType},
};

#[derive(Clone)]
pub struct ForecastRepository {
    pool: PgPool,
}

impl ForecastRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One observation per order line for the item; cancelled orders do not count as demand.
    pub async fn demand_history(&self, item_id: Uuid) -> Result<Vec<DemandObservation>, AppError> {
        let history = sqlx::query_as::<_, DemandObservation>(
            r#"
            SELECT o.order_date AS date, oi.quantity::BIGINT AS quantity
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE oi.inventory_item_id = $1 AND o.status <> 'cancelled'
            ORDER BY o.order_date ASC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }

    /// Appends one record per point. Existing records are never updated.
    pub async fn insert_run<'e, E>(
        &self,
        executor: E,
        item_id: Uuid,
        model_type: ModelType,
        points: &[ForecastPoint],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if points.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO forecasts (item_id, forecast_date, predicted_demand, confidence_lower, confidence_upper, model_type) ",
        );
        query.push_values(points, |mut row, point| {
            row.push_bind(item_id)
                .push_bind(point.date)
                .push_bind(point.predicted_demand)
                .push_bind(point.lower_bound)
                .push_bind(point.upper_bound)
                .push_bind(model_type.as_str());
        });

        let result = query.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn history(&self, item_id: Uuid, limit: i64) -> Result<Vec<ForecastRecord>, AppError> {
        let records = sqlx::query_as::<_, ForecastRecord>(
            r#"
            SELECT * FROM forecasts
            WHERE item_id = $1
            ORDER BY created_at DESC, forecast_date ASC
            LIMIT $2
            "#,
        )
        .bind(item_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
