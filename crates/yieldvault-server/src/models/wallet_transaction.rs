//! Wallet transaction history: append-only record of every balance event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Kinds of wallet-affecting events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Funds paid in against an uploaded proof.
    Deposit,
    /// Funds paid out to the user's bank account.
    Withdrawal,
    /// Principal debited for a plan purchase.
    Purchase,
    /// Maturity payout credited back to the wallet.
    Return,
}

impl TransactionType {
    /// Deposits and withdrawals need an admin decision; the rest are final.
    pub fn requires_review(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::Withdrawal)
    }
}

/// Review state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Represents one entry in a user's transaction history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    /// Unique identifier for this entry.
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Always positive; direction follows from `kind`.
    pub amount: i64,
    pub status: TransactionStatus,
    /// Plan reference for purchases and returns.
    pub plan_id: Option<Uuid>,
    pub description: Option<String>,
    /// Reference to an uploaded payment proof (deposits).
    pub proof: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data required to append a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWalletTransaction {
    pub user_id: Uuid,
    pub kind: TransactionType,
    pub amount: i64,
    pub status: TransactionStatus,
    pub plan_id: Option<Uuid>,
    pub description: Option<String>,
    pub proof: Option<String>,
}

impl WalletTransaction {
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}

impl NewWalletTransaction {
    /// Purchase of a plan; final at creation.
    pub fn purchase(user_id: Uuid, plan_id: Uuid, amount: i64, description: String) -> Self {
        Self {
            user_id,
            kind: TransactionType::Purchase,
            amount,
            status: TransactionStatus::Approved,
            plan_id: Some(plan_id),
            description: Some(description),
            proof: None,
        }
    }

    /// Maturity payout; final at creation.
    pub fn maturity_return(user_id: Uuid, plan_id: Uuid, amount: i64, description: String) -> Self {
        Self {
            user_id,
            kind: TransactionType::Return,
            amount,
            status: TransactionStatus::Approved,
            plan_id: Some(plan_id),
            description: Some(description),
            proof: None,
        }
    }

    /// Deposit request awaiting review.
    pub fn deposit(user_id: Uuid, amount: i64, proof: Option<String>) -> Self {
        Self {
            user_id,
            kind: TransactionType::Deposit,
            amount,
            status: TransactionStatus::Pending,
            plan_id: None,
            description: None,
            proof,
        }
    }

    /// Withdrawal request awaiting review.
    pub fn withdrawal(user_id: Uuid, amount: i64) -> Self {
        Self {
            user_id,
            kind: TransactionType::Withdrawal,
            amount,
            status: TransactionStatus::Pending,
            plan_id: None,
            description: None,
            proof: None,
        }
    }

    pub fn into_transaction(self, id: Uuid, created_at: DateTime<Utc>) -> WalletTransaction {
        WalletTransaction {
            id,
            user_id: self.user_id,
            kind: self.kind,
            amount: self.amount,
            status: self.status,
            plan_id: self.plan_id,
            description: self.description,
            proof: self.proof,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_serialization() {
        assert_eq!(
            serde_json::to_string(&TransactionType::Return).unwrap(),
            "\"return\""
        );
        assert_eq!(
            serde_json::from_str::<TransactionType>("\"withdrawal\"").unwrap(),
            TransactionType::Withdrawal
        );
    }

    #[test]
    fn test_requires_review() {
        assert!(TransactionType::Deposit.requires_review());
        assert!(TransactionType::Withdrawal.requires_review());
        assert!(!TransactionType::Purchase.requires_review());
        assert!(!TransactionType::Return.requires_review());
    }

    #[test]
    fn test_purchase_and_return_are_approved() {
        let user = Uuid::new_v4();
        let plan = Uuid::new_v4();
        let purchase = NewWalletTransaction::purchase(user, plan, 5000, "Gold".to_string());
        assert_eq!(purchase.status, TransactionStatus::Approved);
        assert_eq!(purchase.plan_id, Some(plan));

        let ret = NewWalletTransaction::maturity_return(user, plan, 5600, "matured".to_string());
        assert_eq!(ret.kind, TransactionType::Return);
        assert_eq!(ret.status, TransactionStatus::Approved);
    }

    #[test]
    fn test_requests_start_pending() {
        let user = Uuid::new_v4();
        let deposit = NewWalletTransaction::deposit(user, 2500, Some("proof-17.png".to_string()));
        assert_eq!(deposit.status, TransactionStatus::Pending);
        assert_eq!(deposit.proof.as_deref(), Some("proof-17.png"));

        let withdrawal = NewWalletTransaction::withdrawal(user, 700);
        assert_eq!(withdrawal.kind, TransactionType::Withdrawal);
        assert_eq!(withdrawal.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_transaction_serializes_kind_as_type() {
        let tx = NewWalletTransaction::withdrawal(Uuid::new_v4(), 700)
            .into_transaction(Uuid::new_v4(), Utc::now());
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "withdrawal");
        assert_eq!(json["status"], "pending");
        assert!(json["planId"].is_null());
    }
}
