//! Wallet ledger: balances, deposit and withdrawal requests, admin review.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::locks::UserLocks;
use crate::models::{NewWalletTransaction, TransactionStatus, Wallet, WalletTransaction};
use crate::store::{LedgerStore, ReviewCommit, ReviewReceipt};

/// Outcome an admin can give a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for TransactionStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => TransactionStatus::Approved,
            ReviewDecision::Rejected => TransactionStatus::Rejected,
        }
    }
}

#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<dyn LedgerStore>,
    locks: Arc<UserLocks>,
    clock: Arc<dyn Clock>,
}

impl WalletLedger {
    pub fn new(store: Arc<dyn LedgerStore>, locks: Arc<UserLocks>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            locks,
            clock,
        }
    }

    /// Opens a wallet. Users are provisioned elsewhere; this only attaches
    /// the ledger side.
    pub async fn open_wallet(
        &self,
        user_id: Uuid,
        opening_balance: i64,
    ) -> Result<Wallet, AppError> {
        if opening_balance < 0 {
            return Err(AppError::BadRequest(
                "Opening balance cannot be negative".to_string(),
            ));
        }
        let wallet = self
            .store
            .open_wallet(user_id, opening_balance, self.clock.now())
            .await?;
        tracing::info!(user_id = %user_id, balance = opening_balance, "Wallet opened");
        Ok(wallet)
    }

    pub async fn wallet(&self, user_id: Uuid) -> Result<Wallet, AppError> {
        self.store
            .wallet(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet not found for user {}", user_id)))
    }

    /// Records a deposit awaiting review. The balance moves on approval.
    pub async fn request_deposit(
        &self,
        user_id: Uuid,
        amount: i64,
        proof: Option<String>,
    ) -> Result<WalletTransaction, AppError> {
        validate_amount(amount)?;
        let transaction = self
            .store
            .append_transaction(
                NewWalletTransaction::deposit(user_id, amount, proof),
                self.clock.now(),
            )
            .await?;
        tracing::info!(
            user_id = %user_id,
            amount,
            transaction_id = %transaction.id,
            "Deposit requested"
        );
        Ok(transaction)
    }

    /// Records a withdrawal awaiting review.
    ///
    /// The balance is checked now and again on approval, since purchases may
    /// spend it in between.
    pub async fn request_withdrawal(
        &self,
        user_id: Uuid,
        amount: i64,
    ) -> Result<WalletTransaction, AppError> {
        validate_amount(amount)?;
        let _guard = self.locks.lock(user_id).await;

        let wallet = self.wallet(user_id).await?;
        if !wallet.has_sufficient_balance(amount) {
            return Err(AppError::InsufficientFunds {
                required: amount,
                available: wallet.balance,
            });
        }
        let transaction = self
            .store
            .append_transaction(NewWalletTransaction::withdrawal(user_id, amount), self.clock.now())
            .await?;
        tracing::info!(
            user_id = %user_id,
            amount,
            transaction_id = %transaction.id,
            "Withdrawal requested"
        );
        Ok(transaction)
    }

    /// Approves or rejects a pending deposit or withdrawal.
    pub async fn review(
        &self,
        transaction_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<ReviewReceipt, AppError> {
        let transaction = self
            .store
            .transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;
        if !transaction.kind.requires_review() {
            return Err(AppError::BadRequest(
                "Only deposits and withdrawals can be reviewed".to_string(),
            ));
        }

        let _guard = self.locks.lock(transaction.user_id).await;
        let receipt = self
            .store
            .commit_review(ReviewCommit {
                transaction_id,
                decision: decision.into(),
                now: self.clock.now(),
            })
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("Transaction has already been reviewed".to_string())
            })?;

        tracing::info!(
            transaction_id = %transaction_id,
            user_id = %receipt.transaction.user_id,
            kind = ?receipt.transaction.kind,
            decision = ?decision,
            balance = receipt.balance,
            "Transaction reviewed"
        );
        Ok(receipt)
    }

    /// A user's history, newest first.
    pub async fn history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        Ok(self.store.transactions_for_user(user_id, limit).await?)
    }

    /// Requests awaiting an admin decision, oldest first.
    pub async fn pending(&self) -> Result<Vec<WalletTransaction>, AppError> {
        Ok(self.store.pending_transactions().await?)
    }
}

fn validate_amount(amount: i64) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::BadRequest("Amount must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn test_deposit_credits_only_on_approval() {
        let fx = Fixture::new();
        let user = fx.user(0).await;
        let ledger = fx.wallet();

        let deposit = ledger
            .request_deposit(user, 2500, Some("proof-123.png".to_string()))
            .await
            .unwrap();
        assert_eq!(deposit.status, TransactionStatus::Pending);
        assert_eq!(deposit.proof.as_deref(), Some("proof-123.png"));
        assert_eq!(fx.balance(user).await, 0);
        assert_eq!(ledger.pending().await.unwrap().len(), 1);

        let receipt = ledger.review(deposit.id, ReviewDecision::Approved).await.unwrap();
        assert_eq!(receipt.balance, 2500);
        assert_eq!(receipt.transaction.status, TransactionStatus::Approved);
        assert_eq!(fx.balance(user).await, 2500);
        assert!(ledger.pending().await.unwrap().is_empty());

        let err = ledger
            .review(deposit.id, ReviewDecision::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(fx.balance(user).await, 2500);
    }

    #[tokio::test]
    async fn test_deposit_that_would_overflow_is_refused() {
        let fx = Fixture::new();
        let user = fx.user(10).await;
        let ledger = fx.wallet();

        let deposit = ledger.request_deposit(user, i64::MAX, None).await.unwrap();
        let err = ledger
            .review(deposit.id, ReviewDecision::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert_eq!(fx.balance(user).await, 10);
        let stored = fx.store.transaction(deposit.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);

        // Still reviewable once the admin rejects it.
        let receipt = ledger.review(deposit.id, ReviewDecision::Rejected).await.unwrap();
        assert_eq!(receipt.balance, 10);
    }

    #[tokio::test]
    async fn test_rejected_deposit_leaves_balance() {
        let fx = Fixture::new();
        let user = fx.user(100).await;
        let ledger = fx.wallet();

        let deposit = ledger.request_deposit(user, 900, None).await.unwrap();
        let receipt = ledger.review(deposit.id, ReviewDecision::Rejected).await.unwrap();
        assert_eq!(receipt.transaction.status, TransactionStatus::Rejected);
        assert_eq!(fx.balance(user).await, 100);
    }

    #[tokio::test]
    async fn test_withdrawal_rechecked_on_approval() {
        let fx = Fixture::new();
        let user = fx.user(6000).await;
        let plan = fx.plan(5000, 5600, false).await;
        let ledger = fx.wallet();

        let err = ledger.request_withdrawal(user, 7000).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds { .. }));

        let withdrawal = ledger.request_withdrawal(user, 4000).await.unwrap();
        assert_eq!(withdrawal.kind, TransactionType::Withdrawal);

        // A purchase spends the balance before the admin gets to it.
        fx.engine().buy(user, plan.id).await.unwrap();
        let err = ledger
            .review(withdrawal.id, ReviewDecision::Approved)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientFunds {
                required: 4000,
                available: 1000
            }
        ));
        assert_eq!(fx.balance(user).await, 1000);
        assert!(ledger.pending().await.unwrap().iter().any(|tx| tx.id == withdrawal.id));
    }

    #[tokio::test]
    async fn test_withdrawal_approval_debits() {
        let fx = Fixture::new();
        let user = fx.user(6000).await;
        let ledger = fx.wallet();

        let withdrawal = ledger.request_withdrawal(user, 4000).await.unwrap();
        let receipt = ledger
            .review(withdrawal.id, ReviewDecision::Approved)
            .await
            .unwrap();
        assert_eq!(receipt.balance, 2000);
    }

    #[tokio::test]
    async fn test_purchase_entries_cannot_be_reviewed() {
        let fx = Fixture::new();
        let user = fx.user(6000).await;
        let plan = fx.plan(5000, 5600, false).await;
        let outcome = fx.engine().buy(user, plan.id).await.unwrap();

        let err = fx
            .wallet()
            .review(outcome.transaction.id, ReviewDecision::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = fx
            .wallet()
            .review(Uuid::new_v4(), ReviewDecision::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_amounts_must_be_positive() {
        let fx = Fixture::new();
        let user = fx.user(6000).await;
        let ledger = fx.wallet();
        assert!(matches!(
            ledger.request_deposit(user, 0, None).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            ledger.request_withdrawal(user, -5).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            ledger.open_wallet(Uuid::new_v4(), -1).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let fx = Fixture::new();
        let user = fx.user(0).await;
        let ledger = fx.wallet();
        let first = ledger.request_deposit(user, 100, None).await.unwrap();
        let second = ledger.request_deposit(user, 200, None).await.unwrap();

        let history = ledger.history(user, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);
        assert_eq!(ledger.history(user, Some(1)).await.unwrap().len(), 1);
    }
}
