// src/models/forecast.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Moving-average heuristic used when history is too short
    SimpleAverage,
    /// Additive trend + seasonality model
    SeasonalDecomposition,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::SimpleAverage => "simple_average",
            ModelType::SeasonalDecomposition => "seasonal_decomposition",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_demand: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Restock,
    Overstock,
    DemandSpike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ForecastReport {
    pub item_id: Uuid,
    pub item_name: String,
    #[schema(example = "7 days")]
    pub forecast_period: String,
    pub model_type: ModelType,
    pub forecast: Vec<ForecastPoint>,
    pub current_stock: i32,
    pub recommendations: Vec<Recommendation>,
}

// A row of the append-only 'forecasts' table
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ForecastRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub forecast_date: NaiveDate,
    pub predicted_demand: f64,
    pub confidence_lower: Option<f64>,
    pub confidence_upper: Option<f64>,
    pub model_type: String,
    pub created_at: DateTime<Utc>,
}

fn default_horizon() -> u32 {
    7
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForecastPayload {
    #[validate(required(message = "Item ID is required"))]
    pub item_id: Option<Uuid>,
    /// Horizon in days
    #[validate(range(min = 1, max = 365, message = "Days must be between 1 and 365"))]
    #[serde(default = "default_horizon")]
    #[schema(example = 7)]
    pub days: u32,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastHistoryQuery {
    /// Max records to return (default 50, max 500)
    pub limit: Option<i64>,
}

/// One order line's contribution to demand history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct DemandObservation {
    pub date: NaiveDate,
    pub quantity: i64,
}
