//! API routes for the YieldVault server.

pub mod admin;
pub mod plans;
pub mod user;
pub mod wallet;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Creates the main API router with all routes mounted.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Creates the v1 API routes.
fn api_v1_routes(state: AppState) -> Router {
    Router::new()
        .nest("/plans", plans::router(state.clone()))
        .nest("/user", user::router(state.clone()))
        .nest("/wallet", wallet::router(state.clone()))
        .nest("/admin", admin::router(state))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
