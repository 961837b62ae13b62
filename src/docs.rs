// src/docs.rs

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "SCM-Core API", description = "Inventory, purchase orders and AI-assisted planning"),
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::profile,

        // --- Inventory ---
        handlers::inventory::list_items,
        handlers::inventory::create_item,
        handlers::inventory::get_item,
        handlers::inventory::update_item,
        handlers::inventory::delete_item,
        handlers::inventory::low_stock_alerts,
        handlers::inventory::list_categories,

        // --- Orders ---
        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        handlers::orders::order_stats,

        // --- AI ---
        handlers::ai::chat,
        handlers::ai::forecast,
        handlers::ai::forecast_history,
        handlers::ai::modes,
    ),
    components(
        schemas(
            models::MessageResponse,

            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::RegisterResponse,
            models::auth::LoginResponse,
            models::auth::ProfileResponse,

            // --- Inventory ---
            models::inventory::Item,
            models::inventory::ItemView,
            models::inventory::ItemPage,
            models::inventory::ItemResponse,
            models::inventory::ItemMutationResponse,
            models::inventory::StockAlert,
            models::inventory::AlertsResponse,
            models::inventory::CategoriesResponse,
            handlers::inventory::CreateItemPayload,
            handlers::inventory::UpdateItemPayload,

            // --- Orders ---
            models::orders::OrderStatus,
            models::orders::Order,
            models::orders::OrderItem,
            models::orders::OrderDetail,
            models::orders::OrderLinePayload,
            models::orders::CreateOrderPayload,
            models::orders::UpdateOrderPayload,
            models::orders::OrderStats,
            models::orders::OrderResponse,
            models::orders::OrderMutationResponse,

            // --- AI ---
            models::chat::ChatPayload,
            models::chat::ChatReply,
            models::chat::AiMode,
            models::chat::AiModes,
            models::forecast::ForecastPayload,
            models::forecast::ModelType,
            models::forecast::ForecastPoint,
            models::forecast::RecommendationKind,
            models::forecast::Priority,
            models::forecast::Recommendation,
            models::forecast::ForecastReport,
            models::forecast::ForecastRecord,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Inventory", description = "Items and stock levels"),
        (name = "Orders", description = "Purchase orders and their lifecycle"),
        (name = "AI", description = "Chat assistant and demand forecasting")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();

        for path in ["/auth/login", "/inventory/{id}", "/orders/stats", "/ai/forecast/{item_id}/history"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
