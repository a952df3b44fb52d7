//! Admin endpoints: plan management, request review, on-demand sweeps.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::jobs::SweepReport;
use crate::models::{NewPlan, PlanUpdate, Wallet, WalletTransaction};
use crate::routes::plans::{categories, PlansResponse};
use crate::services::{PlanView, ReviewDecision};
use crate::state::AppState;
use crate::store::PlatformStats;

/// Request body for opening a wallet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenWalletRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: ReviewDecision,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub message: String,
    pub transaction: WalletTransaction,
    pub wallet_balance: i64,
}

/// Creates the admin router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(platform_dashboard))
        .route("/plans", get(list_all_plans).post(create_plan))
        .route("/plans/{plan_id}", put(update_plan).delete(delete_plan))
        .route("/plans/{plan_id}/toggle-status", put(toggle_plan_status))
        .route("/transactions/pending", get(list_pending))
        .route("/transactions/{transaction_id}/status", put(review_transaction))
        .route("/maturity/run", post(run_maturity_sweep))
        .route("/wallets", post(open_wallet))
        .with_state(state)
}

/// GET /api/v1/admin/dashboard
async fn platform_dashboard(
    State(state): State<AppState>,
) -> Result<Json<PlatformStats>, AppError> {
    Ok(Json(state.portfolio.platform_stats().await?))
}

/// GET /api/v1/admin/plans
///
/// Every plan including inactive ones, newest first.
async fn list_all_plans(State(state): State<AppState>) -> Result<Json<PlansResponse>, AppError> {
    let plans = state
        .catalog
        .list_all()
        .await?
        .into_iter()
        .map(PlanView::new)
        .collect();
    Ok(Json(PlansResponse {
        categories: categories(),
        plans,
    }))
}

/// POST /api/v1/admin/plans
async fn create_plan(
    State(state): State<AppState>,
    Json(plan): Json<NewPlan>,
) -> Result<(StatusCode, Json<PlanView>), AppError> {
    let plan = state.catalog.create(plan).await?;
    Ok((StatusCode::CREATED, Json(PlanView::new(plan))))
}

/// PUT /api/v1/admin/plans/{plan_id}
///
/// Existing investments keep the amounts they were bought at.
async fn update_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
    Json(update): Json<PlanUpdate>,
) -> Result<Json<PlanView>, AppError> {
    let plan = state.catalog.update(plan_id, update).await?;
    Ok(Json(PlanView::new(plan)))
}

/// PUT /api/v1/admin/plans/{plan_id}/toggle-status
async fn toggle_plan_status(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<PlanView>, AppError> {
    let plan = state.catalog.toggle_active(plan_id).await?;
    Ok(Json(PlanView::new(plan)))
}

/// DELETE /api/v1/admin/plans/{plan_id}
///
/// Refused once any investment references the plan.
async fn delete_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.catalog.delete(plan_id).await?;
    Ok(Json(json!({ "message": "Plan deleted successfully" })))
}

/// GET /api/v1/admin/transactions/pending
async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<WalletTransaction>>, AppError> {
    Ok(Json(state.wallet.pending().await?))
}

/// PUT /api/v1/admin/transactions/{transaction_id}/status
///
/// Approving a deposit credits the wallet; approving a withdrawal debits it.
async fn review_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    let receipt = state.wallet.review(transaction_id, request.status).await?;
    Ok(Json(ReviewResponse {
        message: "Transaction status updated".to_string(),
        transaction: receipt.transaction,
        wallet_balance: receipt.balance,
    }))
}

/// POST /api/v1/admin/maturity/run
///
/// Runs one maturity sweep now instead of waiting for the timer.
async fn run_maturity_sweep(
    State(state): State<AppState>,
) -> Result<Json<SweepReport>, AppError> {
    let scheduler = state.scheduler.clone();
    let report = tokio::spawn(async move { scheduler.run_once().await })
        .await
        .map_err(|e| AppError::Internal(format!("Maturity sweep task failed: {}", e)))??;
    Ok(Json(report))
}

/// POST /api/v1/admin/wallets
async fn open_wallet(
    State(state): State<AppState>,
    Json(request): Json<OpenWalletRequest>,
) -> Result<(StatusCode, Json<Wallet>), AppError> {
    let wallet = state
        .wallet
        .open_wallet(request.user_id, request.balance)
        .await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}
