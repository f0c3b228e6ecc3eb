/// HTTP Status Server
///
/// Small axum server exposing the same visibility the console gives:
/// health, stats, the pending queue, and a trigger for an out-of-band
/// search cycle.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;

use crate::state::BotState;

#[derive(Clone)]
pub struct AppState {
    pub state: Arc<BotState>,
    pub search_trigger: Arc<Notify>,
}

/// Create and configure the HTTP server router
pub fn create_router(app: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/queue", get(queue))
        .route("/trigger-search", post(trigger_search))
        .layer(CorsLayer::permissive())
        .with_state(app)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "giveaway_sweeper",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn stats(State(app): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = app.state.snapshot().await;
    Json(serde_json::to_value(snapshot).unwrap_or_default())
}

async fn queue(State(app): State<AppState>) -> Json<serde_json::Value> {
    let pending = app.state.pending().await;
    let count = pending.len();
    Json(serde_json::json!({
        "pending": pending,
        "count": count
    }))
}

async fn trigger_search(State(app): State<AppState>) -> Json<serde_json::Value> {
    log::info!("Search triggered via HTTP endpoint");
    app.search_trigger.notify_one();
    Json(serde_json::json!({ "triggered": true }))
}

/// Start the HTTP server
pub async fn start_server(app: AppState, port: u16) -> Result<()> {
    let router = create_router(app);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .context("Failed to bind HTTP server")?;

    log::info!("Status server listening on port {}", port);

    axum::serve(listener, router)
        .await
        .context("HTTP server error")?;

    Ok(())
}
