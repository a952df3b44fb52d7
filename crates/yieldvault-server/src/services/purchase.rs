//! Purchase engine: turns wallet balance into an active investment.

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::locks::UserLocks;
use crate::models::{Investment, NewInvestment, NewWalletTransaction, Plan, WalletTransaction};
use crate::store::{LedgerStore, PurchaseCommit};

/// Result of a successful purchase.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub investment: Investment,
    pub plan: Plan,
    pub transaction: WalletTransaction,
    /// Wallet balance after the debit.
    pub balance: i64,
}

#[derive(Clone)]
pub struct PurchaseEngine {
    store: Arc<dyn LedgerStore>,
    locks: Arc<UserLocks>,
    clock: Arc<dyn Clock>,
}

impl PurchaseEngine {
    pub fn new(store: Arc<dyn LedgerStore>, locks: Arc<UserLocks>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            locks,
            clock,
        }
    }

    /// Buys `plan_id` for `user_id`.
    ///
    /// Eligibility is checked in a fixed order and the first failing rule is
    /// reported. The debit, the investment and the purchase entry are then
    /// committed as one unit.
    pub async fn buy(&self, user_id: Uuid, plan_id: Uuid) -> Result<PurchaseOutcome, AppError> {
        let _guard = self.locks.lock(user_id).await;

        // Step 1: Plan must exist and be open for purchase
        let plan = self
            .store
            .plan(plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)?;
        if !plan.is_active {
            return Err(AppError::PlanInactive);
        }

        // Step 2: One active investment per plan
        if self
            .store
            .find_active_by_user_and_plan(user_id, plan_id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyActiveInvestment);
        }

        // Step 3: One-time plans are single-use for life
        if plan.one_time_only
            && self
                .store
                .find_any_by_user_and_plan(user_id, plan_id)
                .await?
                .is_some()
        {
            return Err(AppError::OneTimeOnlyViolation);
        }

        // Step 4: Balance must cover the principal
        let wallet = self
            .store
            .wallet(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet not found for user {}", user_id)))?;
        if !wallet.has_sufficient_balance(plan.amount) {
            return Err(AppError::InsufficientFunds {
                required: plan.amount,
                available: wallet.balance,
            });
        }

        let now = self.clock.now();
        let maturity_date = plan.duration.add_to(now).ok_or_else(|| {
            AppError::Internal(format!("Maturity date out of range for plan {}", plan.id))
        })?;

        let description = format!(
            "Investment in {} - Maturity: {}",
            plan.title,
            maturity_date.format("%d/%m/%Y")
        );
        let receipt = self
            .store
            .commit_purchase(PurchaseCommit {
                investment: NewInvestment::new(
                    user_id,
                    plan.id,
                    plan.amount,
                    plan.total_maturity_amount,
                    maturity_date,
                ),
                transaction: NewWalletTransaction::purchase(
                    user_id,
                    plan.id,
                    plan.amount,
                    description,
                ),
                one_time_only: plan.one_time_only,
                now,
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            plan_id = %plan.id,
            investment_id = %receipt.investment.id,
            amount = plan.amount,
            maturity_date = %receipt.investment.maturity_date,
            balance = receipt.balance,
            "Investment purchased"
        );

        Ok(PurchaseOutcome {
            investment: receipt.investment,
            plan,
            transaction: receipt.transaction,
            balance: receipt.balance,
        })
    }
}
