// src/db/inventory_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::{map_unique_violation, AppError},
        pagination::PageRequest,
    },
    models::inventory::{Item, ItemChanges, ItemFilter, NewItem},
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Reads
    // ---

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Item>, AppError> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn sku_exists(&self, sku: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM items WHERE sku = $1)")
            .bind(sku)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Active items matching `filter`, one page at a time, plus the total match count.
    pub async fn list_active(
        &self,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<(Vec<Item>, i64), AppError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items WHERE is_active = TRUE");
        push_filters(&mut count_query, filter);
        let (total,): (i64,) = count_query.build_query_as().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM items WHERE is_active = TRUE");
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = query.build_query_as::<Item>().fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    pub async fn low_stock_items(&self, limit: Option<i64>) -> Result<Vec<Item>, AppError> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT * FROM items
            WHERE is_active = TRUE AND quantity <= minimum_stock
            ORDER BY (minimum_stock - quantity) DESC, name ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn count_active(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE is_active = TRUE")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT category FROM items
            WHERE is_active = TRUE AND category IS NOT NULL
            ORDER BY category ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    /// Ids among `ids` that refer to active items.
    pub async fn find_active_by_ids<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = ANY($1) AND is_active = TRUE")
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    // ---
    // Writes
    // ---

    pub async fn create_item<'e, E>(&self, executor: E, new_item: &NewItem) -> Result<Item, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (
                name, description, sku, quantity, unit_price,
                category, location, minimum_stock, supplier_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&new_item.name)
        .bind(&new_item.description)
        .bind(&new_item.sku)
        .bind(new_item.quantity)
        .bind(new_item.unit_price)
        .bind(&new_item.category)
        .bind(&new_item.location)
        .bind(new_item.minimum_stock)
        .bind(new_item.supplier_id)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::SkuAlreadyExists))
    }

    // COALESCE keeps the stored value for every field left as None
    pub async fn update_item<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: &ItemChanges,
    ) -> Result<Option<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET
                name          = COALESCE($2, name),
                description   = COALESCE($3, description),
                quantity      = COALESCE($4, quantity),
                unit_price    = COALESCE($5, unit_price),
                category      = COALESCE($6, category),
                location      = COALESCE($7, location),
                minimum_stock = COALESCE($8, minimum_stock),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.quantity)
        .bind(changes.unit_price)
        .bind(&changes.category)
        .bind(&changes.location)
        .bind(changes.minimum_stock)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    /// Soft delete. Returns false when the item does not exist.
    pub async fn deactivate<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE items SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Adds `delta` to the on-hand quantity of one item.
    pub async fn increment_quantity<'e, E>(&self, executor: E, id: Uuid, delta: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE items SET quantity = quantity + $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(executor)
            .await?;
        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ItemFilter) {
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR sku ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        query.push(" AND category = ").push_bind(category.to_string());
    }
    if filter.low_stock_only {
        query.push(" AND quantity <= minimum_stock");
    }
}
