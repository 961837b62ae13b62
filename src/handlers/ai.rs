// src/handlers/ai.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        chat::{AiModes, ChatPayload, ChatReply},
        forecast::{ForecastHistoryQuery, ForecastPayload, ForecastRecord, ForecastReport},
    },
};

// POST /ai/chat
#[utoipa::path(
    post,
    path = "/ai/chat",
    tag = "AI",
    request_body = ChatPayload,
    responses(
        (status = 200, description = "Model answer, or a fallback answer when the model is unavailable", body = ChatReply),
        (status = 400, description = "Empty query")
    ),
    security(("api_jwt" = []))
)]
pub async fn chat(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ChatPayload>, AppError>,
) -> Result<Json<ChatReply>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.chat_service.answer(&payload.query).await))
}

// POST /ai/forecast
#[utoipa::path(
    post,
    path = "/ai/forecast",
    tag = "AI",
    request_body = ForecastPayload,
    responses(
        (status = 200, description = "Daily demand forecast with recommendations", body = ForecastReport),
        (status = 400, description = "Missing item id or horizon out of range"),
        (status = 404, description = "Item not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn forecast(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ForecastPayload>, AppError>,
) -> Result<Json<ForecastReport>, AppError> {
    payload.validate()?;
    let item_id = payload
        .item_id
        .ok_or_else(|| AppError::InvalidInput("Item ID is required".to_string()))?;

    let report = app_state.forecast_service.forecast_item(item_id, payload.days).await?;
    Ok(Json(report))
}

// GET /ai/forecast/{item_id}/history
#[utoipa::path(
    get,
    path = "/ai/forecast/{item_id}/history",
    tag = "AI",
    params(
        ("item_id" = Uuid, Path, description = "Item id"),
        ForecastHistoryQuery
    ),
    responses(
        (status = 200, description = "Stored forecast points, newest run first", body = [ForecastRecord]),
        (status = 404, description = "Item not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn forecast_history(
    State(app_state): State<AppState>,
    WithRejection(Path(item_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<ForecastHistoryQuery>, AppError>,
) -> Result<Json<Vec<ForecastRecord>>, AppError> {
    let records = app_state.forecast_service.history(item_id, query.limit).await?;
    Ok(Json(records))
}

// GET /ai/modes
#[utoipa::path(
    get,
    path = "/ai/modes",
    tag = "AI",
    responses(
        (status = 200, description = "Available AI features", body = AiModes)
    ),
    security(("api_jwt" = []))
)]
pub async fn modes() -> Json<AiModes> {
    Json(AiModes::catalogue())
}
