// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, validation::validate_price},
    config::AppState,
    models::{
        inventory::{
            AlertsResponse, CategoriesResponse, ItemChanges, ItemListQuery, ItemMutationResponse, ItemPage,
            ItemResponse, NewItem,
        },
        MessageResponse,
    },
};

fn default_minimum_stock() -> i32 {
    10
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemPayload {
    #[validate(length(min = 1, max = 200, message = "Name is required."))]
    #[schema(example = "USB Cable")]
    pub name: String,

    pub description: Option<String>,

    #[validate(length(min = 1, max = 50, message = "SKU is required."))]
    #[schema(example = "USB-001")]
    pub sku: String,

    #[validate(range(min = 0, max = 1_000_000_000, message = "Quantity must be between 0 and 1000000000."))]
    #[serde(default)]
    pub quantity: i32,

    #[validate(custom(function = "validate_price"))]
    #[serde(default)]
    #[schema(value_type = f64, example = 15.99)]
    pub unit_price: Decimal,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    #[validate(length(max = 100))]
    pub location: Option<String>,

    #[validate(range(min = 0, max = 1_000_000_000, message = "Minimum stock must be between 0 and 1000000000."))]
    #[serde(default = "default_minimum_stock")]
    pub minimum_stock: i32,

    pub supplier_id: Option<Uuid>,
}

impl From<CreateItemPayload> for NewItem {
    fn from(p: CreateItemPayload) -> Self {
        Self {
            name: p.name,
            description: p.description,
            sku: p.sku,
            quantity: p.quantity,
            unit_price: p.unit_price,
            category: p.category,
            location: p.location,
            minimum_stock: p.minimum_stock,
            supplier_id: p.supplier_id,
        }
    }
}

/// Only the fields present in the body are changed. SKU and supplier are fixed.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 1_000_000_000, message = "Quantity must be between 0 and 1000000000."))]
    pub quantity: Option<i32>,
    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = Option<f64>)]
    pub unit_price: Option<Decimal>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(range(min = 0, max = 1_000_000_000, message = "Minimum stock must be between 0 and 1000000000."))]
    pub minimum_stock: Option<i32>,
}

impl From<UpdateItemPayload> for ItemChanges {
    fn from(p: UpdateItemPayload) -> Self {
        Self {
            name: p.name,
            description: p.description,
            quantity: p.quantity,
            unit_price: p.unit_price,
            category: p.category,
            location: p.location,
            minimum_stock: p.minimum_stock,
        }
    }
}

// GET /inventory/
#[utoipa::path(
    get,
    path = "/inventory/",
    tag = "Inventory",
    params(ItemListQuery),
    responses(
        (status = 200, description = "One page of active items", body = ItemPage)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ItemListQuery>, AppError>,
) -> Result<Json<ItemPage>, AppError> {
    let page = app_state.inventory_service.list_items(query).await?;
    Ok(Json(page))
}

// POST /inventory/
#[utoipa::path(
    post,
    path = "/inventory/",
    tag = "Inventory",
    request_body = CreateItemPayload,
    responses(
        (status = 201, description = "Item created", body = ItemMutationResponse),
        (status = 400, description = "Invalid input or duplicate SKU")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateItemPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = app_state.inventory_service.create_item(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ItemMutationResponse {
            message: "Item created successfully".to_string(),
            item: item.into(),
        }),
    ))
}

// GET /inventory/{id}
#[utoipa::path(
    get,
    path = "/inventory/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "The item", body = ItemResponse),
        (status = 404, description = "Item not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<ItemResponse>, AppError> {
    let item = app_state.inventory_service.get_item(id).await?;
    Ok(Json(ItemResponse { item: item.into() }))
}

// PUT /inventory/{id}
#[utoipa::path(
    put,
    path = "/inventory/{id}",
    tag = "Inventory",
    request_body = UpdateItemPayload,
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item updated", body = ItemMutationResponse),
        (status = 404, description = "Item not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateItemPayload>, AppError>,
) -> Result<Json<ItemMutationResponse>, AppError> {
    payload.validate()?;

    let item = app_state.inventory_service.update_item(id, payload.into()).await?;

    Ok(Json(ItemMutationResponse {
        message: "Item updated successfully".to_string(),
        item: item.into(),
    }))
}

// DELETE /inventory/{id}
#[utoipa::path(
    delete,
    path = "/inventory/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deactivated", body = MessageResponse),
        (status = 404, description = "Item not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    app_state.inventory_service.delete_item(id).await?;
    Ok(Json(MessageResponse::new("Item deleted successfully")))
}

// GET /inventory/alerts
#[utoipa::path(
    get,
    path = "/inventory/alerts",
    tag = "Inventory",
    responses(
        (status = 200, description = "Active items at or below their minimum stock", body = AlertsResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn low_stock_alerts(State(app_state): State<AppState>) -> Result<Json<AlertsResponse>, AppError> {
    let alerts = app_state.inventory_service.low_stock_alerts().await?;
    let count = alerts.len();
    Ok(Json(AlertsResponse { alerts, count }))
}

// GET /inventory/categories
#[utoipa::path(
    get,
    path = "/inventory/categories",
    tag = "Inventory",
    responses(
        (status = 200, description = "Distinct categories of active items", body = CategoriesResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_categories(State(app_state): State<AppState>) -> Result<Json<CategoriesResponse>, AppError> {
    let categories = app_state.inventory_service.categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_payload_fills_defaults() {
        let payload: CreateItemPayload = serde_json::from_value(json!({
            "name": "USB Cable",
            "sku": "USB-001"
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert_eq!(payload.quantity, 0);
        assert_eq!(payload.unit_price, Decimal::ZERO);
        assert_eq!(payload.minimum_stock, 10);
    }

    #[test]
    fn negative_numbers_fail_validation() {
        let payload: CreateItemPayload = serde_json::from_value(json!({
            "name": "USB Cable",
            "sku": "USB-001",
            "quantity": -1,
            "unit_price": -2.5
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("unit_price"));
    }

    #[test]
    fn out_of_column_numbers_fail_validation() {
        let payload: CreateItemPayload = serde_json::from_value(json!({
            "name": "USB Cable",
            "sku": "USB-001",
            "quantity": 2_000_000_000,
            "unit_price": 123456789.5
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("unit_price"));
    }

    #[test]
    fn sub_cent_update_price_fails_validation() {
        let payload: UpdateItemPayload = serde_json::from_value(json!({ "unit_price": 0.005 })).unwrap();
        assert!(payload.validate().unwrap_err().field_errors().contains_key("unit_price"));
    }

    #[test]
    fn blank_sku_fails_validation() {
        let payload: CreateItemPayload = serde_json::from_value(json!({ "name": "Cable", "sku": "" })).unwrap();
        assert!(payload.validate().unwrap_err().field_errors().contains_key("sku"));
    }

    #[test]
    fn update_payload_keeps_absent_fields_unset() {
        let payload: UpdateItemPayload = serde_json::from_value(json!({ "quantity": 40 })).unwrap();
        let changes = ItemChanges::from(payload);

        assert_eq!(changes.quantity, Some(40));
        assert!(changes.name.is_none());
        assert!(changes.unit_price.is_none());
    }
}
