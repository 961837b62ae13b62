// src/db/order_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::orders::{
        NewOrder, NewOrderLine, Order, OrderChanges, OrderItem, OrderStats, OrderStatus, OrderSummary,
    },
};

const ORDER_ITEM_COLUMNS: &str = r#"
    oi.id, oi.order_id, oi.inventory_item_id,
    i.name AS item_name, i.sku AS item_sku,
    oi.quantity, oi.unit_price, oi.total_price
"#;

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  READS
    // =========================================================================

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Same as `find_by_id`, but row-locks the order until the transaction ends.
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, AppError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM orders");
        if let Some(status) = status {
            query.push(" WHERE status = ").push_bind(status);
        }
        query.push(" ORDER BY created_at DESC");
        let orders = query.build_query_as::<Order>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    pub async fn list_items<'e, E>(&self, executor: E, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {ORDER_ITEM_COLUMNS}
            FROM order_items oi
            LEFT JOIN items i ON i.id = oi.inventory_item_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, i.name
            "#
        );
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_ids)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    pub async fn stats(&self, month_start: NaiveDate) -> Result<OrderStats, AppError> {
        let stats = sqlx::query_as::<_, OrderStats>(
            r#"
            SELECT
                COUNT(*)                                        AS total_orders,
                COUNT(*) FILTER (WHERE status = 'pending')      AS pending_orders,
                COUNT(*) FILTER (WHERE status = 'approved')     AS approved_orders,
                COUNT(*) FILTER (WHERE status = 'ordered')      AS ordered_orders,
                COUNT(*) FILTER (WHERE status = 'received')     AS completed_orders,
                COUNT(*) FILTER (WHERE status = 'cancelled')    AS cancelled_orders,
                COALESCE(SUM(total_amount) FILTER (WHERE status <> 'cancelled'), 0) AS total_value,
                COALESCE(SUM(total_amount) FILTER (
                    WHERE status <> 'cancelled' AND order_date >= $1
                ), 0) AS monthly_value
            FROM orders
            "#,
        )
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    pub async fn recent_summaries(&self, limit: i64) -> Result<Vec<OrderSummary>, AppError> {
        let summaries = sqlx::query_as::<_, OrderSummary>(
            r#"
            SELECT
                o.order_number, o.supplier_name, o.status,
                COALESCE(SUM(oi.quantity), 0)::BIGINT AS total_units
            FROM orders o
            LEFT JOIN order_items oi ON oi.order_id = o.id
            GROUP BY o.id
            ORDER BY o.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    // =========================================================================
    //  WRITES
    // =========================================================================

    pub async fn insert_order<'e, E>(&self, executor: E, order: &NewOrder, total: rust_decimal::Decimal) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_number, supplier_name, supplier_contact, status,
                total_amount, order_date, expected_delivery, created_by
            )
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&order.order_number)
        .bind(&order.supplier_name)
        .bind(&order.supplier_contact)
        .bind(total)
        .bind(order.order_date)
        .bind(order.expected_delivery)
        .bind(order.created_by)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, |_| {
                AppError::InvalidInput(format!("Order number {} already exists", order.order_number))
            })
        })
    }

    pub async fn insert_line<'e, E>(&self, executor: E, order_id: Uuid, line: &NewOrderLine) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, inventory_item_id, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(line.inventory_item_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.total())
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Applies field edits and an optional new status; `total_amount` is never touched.
    pub async fn update_order<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: &OrderChanges,
        mark_delivered: bool,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                supplier_name     = COALESCE($2, supplier_name),
                supplier_contact  = COALESCE($3, supplier_contact),
                expected_delivery = COALESCE($4, expected_delivery),
                status            = COALESCE($5, status),
                actual_delivery   = CASE WHEN $6 THEN COALESCE(actual_delivery, CURRENT_DATE)
                                         ELSE actual_delivery END,
                updated_at        = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.supplier_name)
        .bind(&changes.supplier_contact)
        .bind(changes.expected_delivery)
        .bind(changes.status)
        .bind(mark_delivered)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    /// Hard delete; lines go with the order (ON DELETE CASCADE).
    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
