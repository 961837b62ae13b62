// src/ai/chatbot.rs
//
// Prompt construction for the SCM assistant: which context to inject for a
// query, how to render it, and what to say when the model is unreachable.

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::{inventory::Item, orders::OrderSummary},
};

pub const CONTEXT_ROW_LIMIT: i64 = 5;

pub const SYSTEM_PROMPT: &str = "You are an expert Supply Chain Management assistant. You help with:
- Inventory optimization and management
- Demand forecasting and planning
- Supplier relationship management
- Order processing and tracking
- Logistics and distribution planning
- Risk analysis and mitigation
- Cost optimization strategies
- Performance metrics and KPIs

Provide practical, actionable advice for SCM professionals. Use the provided context data when relevant.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// Low-stock items plus the active item count
    Inventory,
    /// Most recent purchase orders
    RecentOrders,
}

pub struct ContextRule {
    pub keywords: &'static [&'static str],
    pub source: ContextSource,
}

pub const CONTEXT_RULES: &[ContextRule] = &[
    ContextRule {
        keywords: &["inventory", "stock", "item", "product", "sku"],
        source: ContextSource::Inventory,
    },
    ContextRule {
        keywords: &["order", "purchase", "supplier", "delivery"],
        source: ContextSource::RecentOrders,
    },
];

pub struct FallbackRule {
    pub keyword: &'static str,
    pub response: &'static str,
}

// First match wins
pub const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        keyword: "inventory",
        response: "For inventory management, consider implementing ABC analysis, setting appropriate reorder points, and using demand forecasting to optimize stock levels.",
    },
    FallbackRule {
        keyword: "supplier",
        response: "Effective supplier management involves diversifying your supplier base, establishing clear SLAs, regular performance reviews, and maintaining good communication.",
    },
    FallbackRule {
        keyword: "forecast",
        response: "Demand forecasting can be improved by analyzing historical data, considering seasonal patterns, market trends, and using statistical models like moving averages or exponential smoothing.",
    },
    FallbackRule {
        keyword: "cost",
        response: "Cost optimization in SCM can be achieved through bulk purchasing, supplier negotiations, inventory optimization, and reducing transportation costs.",
    },
];

pub const DEFAULT_FALLBACK: &str = "I'm here to help with supply chain management questions. You can ask about inventory management, supplier relationships, demand forecasting, order processing, or logistics planning.";

/// Read-only view of the data the assistant may quote.
#[async_trait]
pub trait ScmSnapshot: Send + Sync {
    async fn low_stock_items(&self, limit: i64) -> Result<Vec<Item>, AppError>;
    async fn active_item_count(&self) -> Result<i64, AppError>;
    async fn recent_orders(&self, limit: i64) -> Result<Vec<OrderSummary>, AppError>;
}

/// Context sources triggered by `query`, in rule-table order.
pub fn matched_sources(query: &str) -> Vec<ContextSource> {
    let query = query.to_lowercase();
    CONTEXT_RULES
        .iter()
        .filter(|rule| rule.keywords.iter().any(|k| query.contains(k)))
        .map(|rule| rule.source)
        .collect()
}

/// Renders the context block for `query`. A source that fails to load is logged and skipped.
pub async fn build_context(snapshot: &dyn ScmSnapshot, query: &str) -> String {
    let mut context = String::new();

    for source in matched_sources(query) {
        let section = match source {
            ContextSource::Inventory => inventory_section(snapshot).await,
            ContextSource::RecentOrders => orders_section(snapshot).await,
        };
        match section {
            Ok(text) => context.push_str(&text),
            Err(e) => tracing::warn!("Could not load {:?} context for chat: {}", source, e),
        }
    }

    context
}

async fn inventory_section(snapshot: &dyn ScmSnapshot) -> Result<String, AppError> {
    let low_stock = snapshot.low_stock_items(CONTEXT_ROW_LIMIT).await?;
    let total_active = snapshot.active_item_count().await?;
    Ok(render_inventory(&low_stock, total_active))
}

async fn orders_section(snapshot: &dyn ScmSnapshot) -> Result<String, AppError> {
    let orders = snapshot.recent_orders(CONTEXT_ROW_LIMIT).await?;
    Ok(render_orders(&orders))
}

pub fn render_inventory(low_stock: &[Item], total_active: i64) -> String {
    let mut out = String::new();
    if !low_stock.is_empty() {
        out.push_str("\nCurrent Low Stock Items:\n");
        for item in low_stock {
            out.push_str(&format!(
                "- {} (SKU: {}): {} units (min: {})\n",
                item.name, item.sku, item.quantity, item.minimum_stock
            ));
        }
    }
    out.push_str(&format!("\nTotal Active Items: {total_active}\n"));
    out
}

pub fn render_orders(orders: &[OrderSummary]) -> String {
    let mut out = String::new();
    if !orders.is_empty() {
        out.push_str("\nRecent Orders:\n");
        for order in orders {
            out.push_str(&format!(
                "- Order #{} from {}: {} units, Status: {}\n",
                order.order_number, order.supplier_name, order.total_units, order.status
            ));
        }
    }
    out
}

pub fn user_prompt(query: &str, context: &str) -> String {
    format!(
        "User question: {query}\n\n{context}\n\nProvide a helpful, specific response based on the question and any relevant context data."
    )
}

pub fn fallback_response(query: &str) -> &'static str {
    let query = query.to_lowercase();
    FALLBACK_RULES
        .iter()
        .find(|rule| query.contains(rule.keyword))
        .map(|rule| rule.response)
        .unwrap_or(DEFAULT_FALLBACK)
}


#[cfg(test)]
mod tests {
    use super::testing::FakeSnapshot;
    use super::*;
    use crate::models::{inventory::fixtures::item, orders::OrderStatus};

    fn summary(number: &str) -> OrderSummary {
        OrderSummary {
            order_number: number.into(),
            supplier_name: "Tech Supplies Inc.".into(),
            status: OrderStatus::Pending,
            total_units: 12,
        }
    }

    #[test]
    fn keywords_select_sources_case_insensitively() {
        assert_eq!(matched_sources("How is our STOCK?"), vec![ContextSource::Inventory]);
        assert_eq!(matched_sources("Late delivery again"), vec![ContextSource::RecentOrders]);
        assert_eq!(
            matched_sources("Which product should I order?"),
            vec![ContextSource::Inventory, ContextSource::RecentOrders]
        );
        assert!(matched_sources("hello there").is_empty());
    }

    #[test]
    fn fallback_picks_first_matching_topic() {
        assert_eq!(fallback_response("Inventory tips?"), FALLBACK_RULES[0].response);
        assert_eq!(fallback_response("supplier cost"), FALLBACK_RULES[1].response);
        assert_eq!(fallback_response("Forecast for May"), FALLBACK_RULES[2].response);
        assert_eq!(fallback_response("hi"), DEFAULT_FALLBACK);
    }

    #[test]
    fn inventory_block_lists_items_and_count() {
        let text = render_inventory(&[item(3, 20)], 42);
        assert!(text.contains("Current Low Stock Items:"));
        assert!(text.contains("- USB Cable (SKU: USB-001): 3 units (min: 20)"));
        assert!(text.contains("Total Active Items: 42"));

        let empty = render_inventory(&[], 7);
        assert!(!empty.contains("Low Stock"));
        assert!(empty.contains("Total Active Items: 7"));
    }

    #[test]
    fn orders_block_is_empty_without_orders() {
        assert!(render_orders(&[]).is_empty());
        assert!(render_orders(&[summary("ORD-1")]).contains("- Order #ORD-1 from Tech Supplies Inc.: 12 units, Status: pending"));
    }

    #[tokio::test]
    async fn context_is_limited_to_five_rows() {
        let snapshot = FakeSnapshot {
            low_stock: (0..8).map(|_| item(1, 10)).collect(),
            active: 8,
            orders: (0..8).map(|i| summary(&format!("ORD-{i}"))).collect(),
            fail: false,
        };
        let context = build_context(&snapshot, "stock and orders").await;
        assert_eq!(context.matches("USB Cable").count(), 5);
        assert_eq!(context.matches("- Order #").count(), 5);
    }

    #[tokio::test]
    async fn unrelated_query_gets_no_context() {
        let snapshot = FakeSnapshot { active: 3, ..Default::default() };
        assert!(build_context(&snapshot, "good morning").await.is_empty());
    }

    #[tokio::test]
    async fn failing_lookups_are_skipped() {
        let snapshot = FakeSnapshot { fail: true, ..Default::default() };
        assert!(build_context(&snapshot, "inventory orders").await.is_empty());
    }

    #[test]
    fn prompt_embeds_question_and_context() {
        let prompt = user_prompt("Reorder?", "\nTotal Active Items: 2\n");
        assert!(prompt.starts_with("User question: Reorder?"));
        assert!(prompt.contains("Total Active Items: 2"));
    }
}
