// src/services/inventory_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    db::InventoryRepository,
    models::inventory::{
        Item, ItemChanges, ItemFilter, ItemListQuery, ItemPage, ItemView, NewItem, StockAlert,
    },
};

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, pool: PgPool) -> Self {
        Self { inventory_repo, pool }
    }

    pub async fn list_items(&self, query: ItemListQuery) -> Result<ItemPage, AppError> {
        let page = PageRequest::new(query.page, query.per_page);
        let filter = ItemFilter {
            search: query.search,
            category: query.category,
            low_stock_only: query.low_stock_only,
        };

        let (items, total) = self.inventory_repo.list_active(&filter, page).await?;

        Ok(ItemPage {
            items: items.into_iter().map(ItemView::from).collect(),
            total,
            pages: page.total_pages(total),
            current_page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get_item(&self, id: Uuid) -> Result<Item, AppError> {
        self.inventory_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ItemNotFound)
    }

    pub async fn create_item(&self, new_item: NewItem) -> Result<Item, AppError> {
        // The unique index still catches a concurrent insert of the same SKU
        if self.inventory_repo.sku_exists(&new_item.sku).await? {
            return Err(AppError::SkuAlreadyExists);
        }

        let item = self.inventory_repo.create_item(&self.pool, &new_item).await?;
        tracing::info!("📦 Created item {} ({})", item.sku, item.id);
        Ok(item)
    }

    pub async fn update_item(&self, id: Uuid, changes: ItemChanges) -> Result<Item, AppError> {
        self.inventory_repo
            .update_item(&self.pool, id, &changes)
            .await?
            .ok_or(AppError::ItemNotFound)
    }

    pub async fn delete_item(&self, id: Uuid) -> Result<(), AppError> {
        if !self.inventory_repo.deactivate(&self.pool, id).await? {
            return Err(AppError::ItemNotFound);
        }
        tracing::info!("🗑️ Deactivated item {}", id);
        Ok(())
    }

    pub async fn low_stock_alerts(&self) -> Result<Vec<StockAlert>, AppError> {
        let items = self.inventory_repo.low_stock_items(None).await?;
        Ok(items.iter().map(StockAlert::from).collect())
    }

    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        self.inventory_repo.categories().await
    }
}
