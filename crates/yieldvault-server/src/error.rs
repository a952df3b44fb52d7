//! Error types for the YieldVault server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Investment plan not found")]
    PlanNotFound,

    #[error("This investment plan is currently inactive")]
    PlanInactive,

    #[error("You already have an active investment in this plan. Please wait for it to mature before investing again.")]
    AlreadyActiveInvestment,

    #[error("This is a one-time investment plan. You have already invested in this plan and cannot invest again.")]
    OneTimeOnlyViolation,

    #[error("Insufficient wallet balance. Required: {required}, Available: {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Cannot delete a plan that has investments. Deactivate it instead.")]
    HasActiveInvestments,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Persistence error: {0}")]
    Persistence(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Overdraft(o) => AppError::InsufficientFunds {
                required: o.required,
                available: o.available,
            },
            StoreError::DuplicateActiveInvestment => AppError::AlreadyActiveInvestment,
            StoreError::OneTimePlanUsed => AppError::OneTimeOnlyViolation,
            StoreError::PlanReferenced(_) => AppError::HasActiveInvestments,
            StoreError::WalletNotFound(user_id) => {
                AppError::NotFound(format!("Wallet not found for user {}", user_id))
            }
            StoreError::BalanceOverflow(o) => AppError::BadRequest(format!(
                "Crediting {} would exceed the maximum wallet balance",
                o.amount
            )),
            StoreError::WalletExists(user_id) => {
                AppError::BadRequest(format!("Wallet already exists for user {}", user_id))
            }
            other => AppError::Persistence(other),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::PlanNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PlanInactive
            | AppError::AlreadyActiveInvestment
            | AppError::OneTimeOnlyViolation
            | AppError::InsufficientFunds { .. }
            | AppError::HasActiveInvestments
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {}", e);
                json!({ "message": "Internal server error" })
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({ "message": "Internal server error" })
            }
            AppError::InsufficientFunds {
                required,
                available,
            } => json!({
                "message": self.to_string(),
                "required": required,
                "available": available,
            }),
            AppError::NotFound(msg) | AppError::BadRequest(msg) => json!({ "message": msg }),
            _ => json!({ "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BalanceOverflow, Overdraft};
    use uuid::Uuid;

    #[test]
    fn test_store_errors_map_to_business_rules() {
        let err: AppError = StoreError::Overdraft(Overdraft {
            required: 5000,
            available: 1000,
        })
        .into();
        assert!(matches!(
            err,
            AppError::InsufficientFunds {
                required: 5000,
                available: 1000
            }
        ));

        let err: AppError = StoreError::DuplicateActiveInvestment.into();
        assert!(matches!(err, AppError::AlreadyActiveInvestment));

        let err: AppError = StoreError::PlanReferenced(Uuid::new_v4()).into();
        assert!(matches!(err, AppError::HasActiveInvestments));

        let err: AppError = StoreError::BalanceOverflow(BalanceOverflow {
            amount: i64::MAX,
            balance: 10,
        })
        .into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = StoreError::Unavailable("down".to_string()).into();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::PlanNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::PlanInactive.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Persistence(StoreError::Unavailable("x".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = AppError::InsufficientFunds {
            required: 5000,
            available: 1000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient wallet balance. Required: 5000, Available: 1000"
        );
    }

    #[tokio::test]
    async fn test_persistence_error_hides_detail() {
        let response =
            AppError::Persistence(StoreError::Unavailable("replica lag".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("replica lag"));
        assert!(text.contains("Internal server error"));
    }
}
