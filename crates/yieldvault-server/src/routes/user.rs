//! User dashboard and investment history endpoints.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::error::AppError;
use crate::routes::plans::UserQuery;
use crate::services::{Dashboard, InvestmentView};
use crate::state::AppState;

/// Creates the user router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/investments", get(list_investments))
        .with_state(state)
}

/// GET /api/v1/user/dashboard
///
/// Balance, totals, every investment and the latest transactions.
async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(state.portfolio.dashboard(query.user_id).await?))
}

/// GET /api/v1/user/investments
///
/// Every investment of the user, newest first.
async fn list_investments(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<InvestmentView>>, AppError> {
    Ok(Json(state.portfolio.investments(query.user_id, false).await?))
}
