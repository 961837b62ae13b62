// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        orders::{
            CreateOrderPayload, OrderDetail, OrderListQuery, OrderMutationResponse, OrderResponse, OrderStats,
            UpdateOrderPayload,
        },
        MessageResponse,
    },
};

// GET /orders/
#[utoipa::path(
    get,
    path = "/orders/",
    tag = "Orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders with their lines, newest first", body = [OrderDetail])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<OrderListQuery>, AppError>,
) -> Result<Json<Vec<OrderDetail>>, AppError> {
    let orders = app_state.order_service.list_orders(query.status).await?;
    Ok(Json(orders))
}

// POST /orders/
#[utoipa::path(
    post,
    path = "/orders/",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Order created in 'pending'", body = OrderMutationResponse),
        (status = 400, description = "Invalid input or unknown item")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateOrderPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state.order_service.create_order(user.id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderMutationResponse {
            message: "Order created successfully".to_string(),
            order,
        }),
    ))
}

// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order with its lines", body = OrderResponse),
        (status = 404, description = "Order not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = app_state.order_service.get_order(id).await?;
    Ok(Json(OrderResponse { order }))
}

// PUT /orders/{id}
#[utoipa::path(
    put,
    path = "/orders/{id}",
    tag = "Orders",
    request_body = UpdateOrderPayload,
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order updated; moving to 'received' books stock", body = OrderMutationResponse),
        (status = 400, description = "Illegal status transition"),
        (status = 404, description = "Order not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_order(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateOrderPayload>, AppError>,
) -> Result<Json<OrderMutationResponse>, AppError> {
    payload.validate()?;

    let order = app_state.order_service.update_order(id, payload.into()).await?;

    Ok(Json(OrderMutationResponse {
        message: "Order updated successfully".to_string(),
        order,
    }))
}

// DELETE /orders/{id}
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order and its lines removed", body = MessageResponse),
        (status = 404, description = "Order not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_order(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    app_state.order_service.delete_order(id).await?;
    Ok(Json(MessageResponse::new("Order deleted successfully")))
}

// GET /orders/stats
#[utoipa::path(
    get,
    path = "/orders/stats",
    tag = "Orders",
    responses(
        (status = 200, description = "Counts per status and order value", body = OrderStats)
    ),
    security(("api_jwt" = []))
)]
pub async fn order_stats(State(app_state): State<AppState>) -> Result<Json<OrderStats>, AppError> {
    let stats = app_state.order_service.stats(Utc::now().date_naive()).await?;
    Ok(Json(stats))
}
