// src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod ai;
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::common::error::AppError;
use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env().context("Invalid configuration")?;
    let bind_addr = settings.bind_addr.clone();
    let app_state = AppState::new(settings).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Database migrations failed")?;
    tracing::info!("✅ Database migrations applied");

    let db_pool = app_state.db_pool.clone();
    let app = build_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Could not bind {bind_addr}"))?;
    tracing::info!("🚀 Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db_pool.close().await;
    tracing::info!("👋 Shut down cleanly");
    Ok(())
}

fn build_router(app_state: AppState) -> Router {
    // Flask-style paths: collections answer with and without the trailing slash
    let protected = Router::new()
        .route("/auth/profile", get(handlers::auth::profile))
        // --- Inventory ---
        .route("/inventory", get(handlers::inventory::list_items).post(handlers::inventory::create_item))
        .route("/inventory/", get(handlers::inventory::list_items).post(handlers::inventory::create_item))
        .route("/inventory/alerts", get(handlers::inventory::low_stock_alerts))
        .route("/inventory/categories", get(handlers::inventory::list_categories))
        .route(
            "/inventory/{id}",
            get(handlers::inventory::get_item)
                .put(handlers::inventory::update_item)
                .delete(handlers::inventory::delete_item),
        )
        // --- Orders ---
        .route("/orders", get(handlers::orders::list_orders).post(handlers::orders::create_order))
        .route("/orders/", get(handlers::orders::list_orders).post(handlers::orders::create_order))
        .route("/orders/stats", get(handlers::orders::order_stats))
        .route(
            "/orders/{id}",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        // --- AI ---
        .route("/ai/chat", post(handlers::ai::chat))
        .route("/ai/forecast", post(handlers::ai::forecast))
        .route("/ai/forecast/{item_id}/history", get(handlers::ai::forecast_history))
        .route("/ai/modes", get(handlers::ai::modes))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "SCM-Core API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> AppError {
    AppError::RouteNotFound
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("🔥 Could not listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("🔥 Could not listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("🛑 Shutdown signal received");
}
