//! Wallet balance, deposit and withdrawal request endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Wallet, WalletTransaction};
use crate::routes::plans::UserQuery;
use crate::state::AppState;

/// Request body for a deposit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub user_id: Uuid,
    pub amount: i64,
    /// Reference to an already uploaded payment proof.
    #[serde(default)]
    pub proof: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub user_id: Uuid,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RequestSubmitted {
    pub message: String,
    pub transaction: WalletTransaction,
}

/// Creates the wallet router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_wallet))
        .route("/deposits", post(request_deposit))
        .route("/withdrawals", post(request_withdrawal))
        .route("/history", get(get_history))
        .with_state(state)
}

/// GET /api/v1/wallet
async fn get_wallet(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Wallet>, AppError> {
    Ok(Json(state.wallet.wallet(query.user_id).await?))
}

/// POST /api/v1/wallet/deposits
///
/// Records a deposit for admin review. The balance is unchanged until then.
async fn request_deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<(StatusCode, Json<RequestSubmitted>), AppError> {
    let transaction = state
        .wallet
        .request_deposit(request.user_id, request.amount, request.proof)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RequestSubmitted {
            message: "Deposit request submitted".to_string(),
            transaction,
        }),
    ))
}

/// POST /api/v1/wallet/withdrawals
async fn request_withdrawal(
    State(state): State<AppState>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<(StatusCode, Json<RequestSubmitted>), AppError> {
    let transaction = state
        .wallet
        .request_withdrawal(request.user_id, request.amount)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RequestSubmitted {
            message: "Withdrawal request submitted".to_string(),
            transaction,
        }),
    ))
}

/// GET /api/v1/wallet/history
///
/// Transaction history, newest first.
async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<WalletTransaction>>, AppError> {
    if query.limit.is_some_and(|limit| limit <= 0) {
        return Err(AppError::BadRequest("Limit must be positive".to_string()));
    }
    Ok(Json(state.wallet.history(query.user_id, query.limit).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_proof_is_optional() {
        let request: DepositRequest = serde_json::from_value(serde_json::json!({
            "userId": Uuid::new_v4(),
            "amount": 2500
        }))
        .unwrap();
        assert_eq!(request.amount, 2500);
        assert!(request.proof.is_none());
    }

    #[test]
    fn test_history_query_limit_is_optional() {
        let query: HistoryQuery = serde_json::from_value(serde_json::json!({
            "userId": Uuid::new_v4()
        }))
        .unwrap();
        assert!(query.limit.is_none());
    }
}
