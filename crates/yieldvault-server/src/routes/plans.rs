//! Plan listing and purchase endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::PlanCategory;
use crate::services::{InvestmentView, PlanView};
use crate::state::AppState;

/// A plan category as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: PlanCategory,
    pub name: &'static str,
}

impl From<PlanCategory> for CategoryView {
    fn from(category: PlanCategory) -> Self {
        Self {
            id: category,
            name: category.label(),
        }
    }
}

/// All plan categories in display order.
pub fn categories() -> Vec<CategoryView> {
    PlanCategory::ALL.into_iter().map(CategoryView::from).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlansQuery {
    /// When set, each plan carries `isLocked` for this user.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub categories: Vec<CategoryView>,
    pub plans: Vec<PlanView>,
}

/// Request body for buying a plan.
/// Note: the user comes from the caller until authentication is in front.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyPlanRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyPlanResponse {
    pub message: String,
    pub investment: InvestmentView,
    pub new_wallet_balance: i64,
}

/// Creates the plans router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_plans))
        .route("/my-investments", get(my_investments))
        .route("/buy/{plan_id}", post(buy_plan))
        .route("/{plan_id}", get(get_plan))
        .with_state(state)
}

/// GET /api/v1/plans
///
/// Active plans newest first, with the category list.
async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<ListPlansQuery>,
) -> Result<Json<PlansResponse>, AppError> {
    let plans = match query.user_id {
        Some(user_id) => state.catalog.plans_with_lock_status(user_id).await?,
        None => state
            .catalog
            .list_active()
            .await?
            .into_iter()
            .map(PlanView::new)
            .collect(),
    };
    Ok(Json(PlansResponse {
        categories: categories(),
        plans,
    }))
}

/// GET /api/v1/plans/{plan_id}
async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<PlanView>, AppError> {
    let plan = state.catalog.get(plan_id).await?;
    Ok(Json(PlanView::new(plan)))
}

/// GET /api/v1/plans/my-investments
///
/// The user's active investments.
async fn my_investments(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<InvestmentView>>, AppError> {
    Ok(Json(state.portfolio.investments(query.user_id, true).await?))
}

/// POST /api/v1/plans/buy/{plan_id}
///
/// Runs the purchase on its own task so a dropped connection cannot cut it
/// short between the eligibility checks and the commit.
async fn buy_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
    Json(request): Json<BuyPlanRequest>,
) -> Result<Json<BuyPlanResponse>, AppError> {
    let engine = state.engine.clone();
    let outcome = tokio::spawn(async move { engine.buy(request.user_id, plan_id).await })
        .await
        .map_err(|e| AppError::Internal(format!("Purchase task failed: {}", e)))??;

    let created_at = outcome.investment.created_at;
    Ok(Json(BuyPlanResponse {
        message: "Investment successful".to_string(),
        investment: InvestmentView::new(outcome.investment, Some(outcome.plan), created_at),
        new_wallet_balance: outcome.balance,
    }))
}
