// src/models/orders.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_price;

// --- Status lifecycle ---
//
// pending -> approved -> ordered -> received
// pending -> cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Ordered,
    Received,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Ordered => "ordered",
            OrderStatus::Received => "received",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether `next` is a legal single step from `self`. Staying put is not a step.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Approved, Ordered) | (Ordered, Received) | (Pending, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Rows ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "ORD-20250116-1A2B3C4D")]
    pub order_number: String,
    #[schema(example = "Tech Supplies Inc.")]
    pub supplier_name: String,
    #[schema(example = "orders@techsupplies.com")]
    pub supplier_contact: Option<String>,
    pub status: OrderStatus,
    #[schema(example = 1799.98)]
    pub total_amount: Decimal,
    pub order_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub actual_delivery: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Order line joined with the item it references
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub inventory_item_id: Uuid,
    pub item_name: Option<String>,
    pub item_sku: Option<String>,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(example = 899.99)]
    pub unit_price: Decimal,
    #[schema(example = 1799.98)]
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// --- Write models ---

/// A line with its unit price already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub inventory_item_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Largest value a `NUMERIC(12, 2)` total column holds.
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Rounds to cents the way Postgres stores a `NUMERIC(_, 2)` value.
pub fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl NewOrderLine {
    /// Quantity times the stored (cent-rounded) unit price, so it matches the persisted line.
    pub fn total(&self) -> Decimal {
        Decimal::from(self.quantity) * to_cents(self.unit_price)
    }
}

/// Sum of line totals; fixed at creation time.
pub fn order_total(lines: &[NewOrderLine]) -> Decimal {
    lines.iter().map(NewOrderLine::total).sum()
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub order_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub created_by: Uuid,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
    pub expected_delivery: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
}

/// `ORD-YYYYMMDD-XXXXXXXX`, the suffix taken from a fresh v4 UUID.
pub fn generate_order_number(date: NaiveDate) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("ORD-{}-{}", date.format("%Y%m%d"), suffix)
}

// --- Payloads ---

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLinePayload {
    pub inventory_item_id: Uuid,
    #[validate(range(min = 1, max = 1_000_000, message = "Quantity must be between 1 and 1000000."))]
    #[schema(example = 2)]
    pub quantity: i32,
    /// Defaults to the item's current unit price
    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = Option<f64>, example = 899.99)]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderPayload {
    #[validate(length(min = 1, max = 255, message = "Supplier name is required."))]
    #[schema(example = "Tech Supplies Inc.")]
    pub supplier_name: String,
    #[validate(length(max = 255))]
    pub supplier_contact: Option<String>,
    /// Defaults to today
    pub order_date: Option<NaiveDate>,
    pub expected_delivery: Option<NaiveDate>,
    #[validate(length(min = 1, message = "At least one order line is required."), nested)]
    pub items: Vec<OrderLinePayload>,
}

/// Line items and the total are fixed once the order exists.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderPayload {
    #[validate(length(min = 1, max = 255))]
    pub supplier_name: Option<String>,
    #[validate(length(max = 255))]
    pub supplier_contact: Option<String>,
    pub expected_delivery: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
}

impl From<UpdateOrderPayload> for OrderChanges {
    fn from(p: UpdateOrderPayload) -> Self {
        Self {
            supplier_name: p.supplier_name,
            supplier_contact: p.supplier_contact,
            expected_delivery: p.expected_delivery,
            status: p.status,
        }
    }
}

// --- Reads ---

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub approved_orders: i64,
    pub ordered_orders: i64,
    /// Orders in the 'received' state
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    /// Sum of all non-cancelled order totals
    pub total_value: Decimal,
    /// Same, restricted to orders dated in the current month
    pub monthly_value: Decimal,
}

/// Compact view used to give the chat assistant some order context.
#[derive(Debug, Clone, FromRow)]
pub struct OrderSummary {
    pub order_number: String,
    pub supplier_name: String,
    pub status: OrderStatus,
    pub total_units: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub order: OrderDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderMutationResponse {
    pub message: String,
    pub order: OrderDetail,
}
