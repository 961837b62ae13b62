// src/services/order_service.rs

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InventoryRepository, OrderRepository},
    models::{
        inventory::Item,
        orders::{
            generate_order_number, order_total, to_cents, CreateOrderPayload, NewOrder, NewOrderLine, Order,
            OrderChanges, OrderDetail, OrderItem, OrderLinePayload, OrderStats, OrderStatus, MAX_ORDER_TOTAL,
        },
    },
};

#[derive(Clone)]
pub struct OrderService {
    order_repo: OrderRepository,
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl OrderService {
    pub fn new(order_repo: OrderRepository, inventory_repo: InventoryRepository, pool: PgPool) -> Self {
        Self { order_repo, inventory_repo, pool }
    }

    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<OrderDetail>, AppError> {
        let orders = self.order_repo.list(status).await?;
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let lines = self.order_repo.list_items(&self.pool, &ids).await?;
        Ok(attach_lines(orders, lines))
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderDetail, AppError> {
        let order = self
            .order_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::OrderNotFound)?;
        self.with_lines(order).await
    }

    pub async fn create_order(&self, created_by: Uuid, payload: CreateOrderPayload) -> Result<OrderDetail, AppError> {
        // 1. Resolve every line against active items before writing anything
        let ids: Vec<Uuid> = payload.items.iter().map(|l| l.inventory_item_id).collect();
        let items = self.inventory_repo.find_active_by_ids(&self.pool, &ids).await?;
        let lines = resolve_lines(&payload.items, &items)?;

        let order_date = payload.order_date.unwrap_or_else(|| Utc::now().date_naive());
        let new_order = NewOrder {
            order_number: generate_order_number(order_date),
            supplier_name: payload.supplier_name,
            supplier_contact: payload.supplier_contact,
            order_date,
            expected_delivery: payload.expected_delivery,
            created_by,
            lines,
        };

        // 2. Header and lines go in together or not at all
        let mut tx = self.pool.begin().await?;
        let order = match self.insert_order(&mut tx, &new_order).await {
            Ok(order) => {
                tx.commit().await?;
                order
            }
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };

        tracing::info!(
            "🧾 Created order {} for '{}' ({} lines, total {})",
            order.order_number,
            order.supplier_name,
            new_order.lines.len(),
            order.total_amount
        );
        self.with_lines(order).await
    }

    /// Edits supplier fields and moves the status forward. Moving into `received` books the
    /// line quantities into stock; repeating the current status changes nothing.
    pub async fn update_order(&self, id: Uuid, changes: OrderChanges) -> Result<OrderDetail, AppError> {
        let mut tx = self.pool.begin().await?;
        let order = match self.apply_update(&mut tx, id, changes).await {
            Ok(order) => {
                tx.commit().await?;
                order
            }
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };
        self.with_lines(order).await
    }

    pub async fn delete_order(&self, id: Uuid) -> Result<(), AppError> {
        if !self.order_repo.delete(&self.pool, id).await? {
            return Err(AppError::OrderNotFound);
        }
        tracing::info!("🗑️ Deleted order {}", id);
        Ok(())
    }

    pub async fn stats(&self, today: NaiveDate) -> Result<OrderStats, AppError> {
        self.order_repo.stats(month_start(today)).await
    }

    // ---
    // Transaction bodies
    // ---

    async fn insert_order(&self, tx: &mut Transaction<'static, Postgres>, new_order: &NewOrder) -> Result<Order, AppError> {
        let total = order_total(&new_order.lines);
        let order = self.order_repo.insert_order(&mut **tx, new_order, total).await?;
        for line in &new_order.lines {
            self.order_repo.insert_line(&mut **tx, order.id, line).await?;
        }
        Ok(order)
    }

    async fn apply_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        id: Uuid,
        mut changes: OrderChanges,
    ) -> Result<Order, AppError> {
        // The row lock serialises concurrent status changes on the same order
        let current = self
            .order_repo
            .find_for_update(&mut **tx, id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        changes.status = plan_status_change(current.status, changes.status)?;
        let receiving = changes.status == Some(OrderStatus::Received);

        if receiving {
            let lines = self.order_repo.list_items(&mut **tx, &[id]).await?;
            let bookings = stock_bookings(&lines);
            for &(item_id, delta) in &bookings {
                self.inventory_repo.increment_quantity(&mut **tx, item_id, delta).await?;
            }
            tracing::info!(
                "📥 Order {} received, {} items restocked from {} lines",
                current.order_number,
                bookings.len(),
                lines.len()
            );
        }

        self.order_repo.update_order(&mut **tx, id, &changes, receiving).await
    }

    async fn with_lines(&self, order: Order) -> Result<OrderDetail, AppError> {
        let items = self.order_repo.list_items(&self.pool, &[order.id]).await?;
        Ok(OrderDetail { order, items })
    }
}

/// Pairs each requested line with its item, taking the item's price when none is given.
pub fn resolve_lines(requested: &[OrderLinePayload], items: &[Item]) -> Result<Vec<NewOrderLine>, AppError> {
    let by_id: HashMap<Uuid, &Item> = items.iter().map(|i| (i.id, i)).collect();

    let lines = requested
        .iter()
        .map(|line| {
            let item = by_id.get(&line.inventory_item_id).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Inventory item {} does not exist or is inactive",
                    line.inventory_item_id
                ))
            })?;
            Ok(NewOrderLine {
                inventory_item_id: item.id,
                quantity: line.quantity,
                unit_price: to_cents(line.unit_price.unwrap_or(item.unit_price)),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    if order_total(&lines) > MAX_ORDER_TOTAL {
        return Err(AppError::InvalidInput(format!(
            "Order total cannot exceed {MAX_ORDER_TOTAL}"
        )));
    }
    Ok(lines)
}

/// The status to write, if any. Re-sending the current status is a no-op.
pub fn plan_status_change(
    current: OrderStatus,
    requested: Option<OrderStatus>,
) -> Result<Option<OrderStatus>, AppError> {
    match requested {
        None => Ok(None),
        Some(next) if next == current => Ok(None),
        Some(next) if current.can_transition_to(next) => Ok(Some(next)),
        Some(next) => Err(AppError::InvalidStatusTransition { from: current, to: next }),
    }
}

/// Stock increments for receiving `lines`: one `(item_id, delta)` per item, summing every
/// line that references it, in first-seen order.
pub fn stock_bookings(lines: &[OrderItem]) -> Vec<(Uuid, i32)> {
    let mut bookings: Vec<(Uuid, i32)> = Vec::new();
    for line in lines {
        match bookings.iter_mut().find(|(id, _)| *id == line.inventory_item_id) {
            Some((_, delta)) => *delta = delta.saturating_add(line.quantity),
            None => bookings.push((line.inventory_item_id, line.quantity)),
        }
    }
    bookings
}

pub fn month_start(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today)
}

fn attach_lines(orders: Vec<Order>, lines: Vec<OrderItem>) -> Vec<OrderDetail> {
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for line in lines {
        by_order.entry(line.order_id).or_default().push(line);
    }

    orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderDetail { order, items }
        })
        .collect()
}
