// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Item (catalogue entry + on-hand stock) ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Item {
    pub id: Uuid,
    #[schema(example = "USB Cable")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "USB-001")]
    pub sku: String,
    #[schema(example = 3)]
    pub quantity: i32,
    #[schema(example = 15.99)]
    pub unit_price: Decimal,
    #[schema(example = "Electronics")]
    pub category: Option<String>,
    #[schema(example = "Warehouse A")]
    pub location: Option<String>,
    #[schema(example = 20)]
    pub minimum_stock: i32,
    pub supplier_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.minimum_stock
    }
}

/// An item as returned by the API, with the derived low-stock flag.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub low_stock_alert: bool,
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        let low_stock_alert = item.is_low_stock();
        Self { item, low_stock_alert }
    }
}

// --- Write models ---

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub category: Option<String>,
    pub location: Option<String>,
    pub minimum_stock: i32,
    pub supplier_id: Option<Uuid>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub minimum_stock: Option<i32>,
}

// --- Listing ---

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemListQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Page size (max 100)
    pub per_page: Option<u32>,
    /// Substring match on name, SKU or description
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub low_stock_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub low_stock_only: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemPage {
    pub items: Vec<ItemView>,
    pub total: i64,
    pub pages: i64,
    pub current_page: u32,
    pub per_page: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub item: ItemView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemMutationResponse {
    pub message: String,
    pub item: ItemView,
}

// --- Alerts ---

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockAlert {
    pub item_id: Uuid,
    pub name: String,
    pub sku: String,
    pub current_quantity: i32,
    pub minimum_stock: i32,
    pub shortage: i32,
    pub category: Option<String>,
}

impl From<&Item> for StockAlert {
    fn from(item: &Item) -> Self {
        Self {
            item_id: item.id,
            name: item.name.clone(),
            sku: item.sku.clone(),
            current_quantity: item.quantity,
            minimum_stock: item.minimum_stock,
            shortage: item.minimum_stock - item.quantity,
            category: item.category.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertsResponse {
    pub alerts: Vec<StockAlert>,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn item(quantity: i32, minimum_stock: i32) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            name: "USB Cable".into(),
            description: None,
            sku: "USB-001".into(),
            quantity,
            unit_price: Decimal::new(1599, 2),
            category: Some("Electronics".into()),
            location: Some("Warehouse A".into()),
            minimum_stock,
            supplier_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::item;
    use super::*;

    #[test]
    fn low_stock_includes_the_threshold() {
        assert!(item(20, 20).is_low_stock());
        assert!(!item(21, 20).is_low_stock());
    }

    #[test]
    fn view_flattens_item_and_adds_flag() {
        let json = serde_json::to_value(ItemView::from(item(3, 20))).unwrap();
        assert_eq!(json["sku"], "USB-001");
        assert_eq!(json["low_stock_alert"], true);
        assert_eq!(json["unit_price"], 15.99);
    }

    #[test]
    fn alert_reports_shortage() {
        let alert = StockAlert::from(&item(3, 20));
        assert_eq!(alert.shortage, 17);
        assert_eq!(alert.current_quantity, 3);
    }
}
