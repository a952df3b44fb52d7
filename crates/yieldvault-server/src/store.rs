//! Storage seam for wallets, plans, investments and transaction history.
//!
//! Every multi-record write that touches a wallet balance goes through one of
//! the `commit_*` operations. Each is a single failure-atomic unit: either all
//! of its writes land or none do.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{
    BalanceOverflow, Investment, NewInvestment, NewPlan, NewWalletTransaction, Overdraft, Plan,
    TransactionStatus, Wallet, WalletTransaction,
};

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Errors raised at the storage boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No wallet for user {0}")]
    WalletNotFound(Uuid),

    #[error("Wallet already exists for user {0}")]
    WalletExists(Uuid),

    #[error(transparent)]
    Overdraft(#[from] Overdraft),

    #[error(transparent)]
    BalanceOverflow(#[from] BalanceOverflow),

    #[error("An active investment already exists for this user and plan")]
    DuplicateActiveInvestment,

    #[error("One-time plan already used by this user")]
    OneTimePlanUsed,

    #[error("Plan {0} is referenced by investments")]
    PlanReferenced(Uuid),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Writes of one plan purchase.
#[derive(Debug, Clone)]
pub struct PurchaseCommit {
    pub investment: NewInvestment,
    pub transaction: NewWalletTransaction,
    /// Re-checked under the wallet lock: no prior investment of any status.
    pub one_time_only: bool,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub investment: Investment,
    pub transaction: WalletTransaction,
    /// Balance after the debit.
    pub balance: i64,
}

/// Writes of one maturity payout.
#[derive(Debug, Clone)]
pub struct MaturityCommit {
    pub investment_id: Uuid,
    /// Return entry; its amount is replaced by the stored payout snapshot.
    pub transaction: NewWalletTransaction,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MaturityReceipt {
    pub investment: Investment,
    pub transaction: WalletTransaction,
    /// Balance after the credit.
    pub balance: i64,
}

/// Admin decision on a pending deposit or withdrawal.
#[derive(Debug, Clone)]
pub struct ReviewCommit {
    pub transaction_id: Uuid,
    pub decision: TransactionStatus,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReviewReceipt {
    pub transaction: WalletTransaction,
    pub balance: i64,
}

/// Platform-wide totals for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    /// Users with a wallet.
    pub total_users: i64,
    pub total_investments: i64,
    pub active_investments: i64,
    pub pending_deposits: i64,
    pub pending_withdrawals: i64,
    /// Principal across every investment regardless of status.
    pub total_invested_amount: i64,
}

/// Interface for ledger persistence.
///
/// # Implementations
///
/// - `PgLedgerStore`: PostgreSQL storage
/// - `MemoryLedgerStore`: in-process storage for tests and local runs
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Creates a wallet for a user with an opening balance.
    async fn open_wallet(&self, user_id: Uuid, balance: i64, now: DateTime<Utc>) -> Result<Wallet>;

    async fn wallet(&self, user_id: Uuid) -> Result<Option<Wallet>>;

    async fn insert_plan(&self, plan: NewPlan, now: DateTime<Utc>) -> Result<Plan>;

    /// Replaces every mutable field of an existing plan. `None` if absent.
    async fn save_plan(&self, plan: &Plan) -> Result<Option<Plan>>;

    /// Flips the active flag. `None` if absent.
    async fn toggle_plan_active(&self, plan_id: Uuid, now: DateTime<Utc>) -> Result<Option<Plan>>;

    /// Deletes an unreferenced plan. `Ok(false)` if absent,
    /// `Err(PlanReferenced)` if any investment points at it.
    async fn delete_plan(&self, plan_id: Uuid) -> Result<bool>;

    async fn plan(&self, plan_id: Uuid) -> Result<Option<Plan>>;

    /// Plans newest first, optionally only active ones.
    async fn plans(&self, active_only: bool) -> Result<Vec<Plan>>;

    async fn investment(&self, investment_id: Uuid) -> Result<Option<Investment>>;

    async fn find_active_by_user_and_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Investment>>;

    /// Any investment regardless of status.
    async fn find_any_by_user_and_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Investment>>;

    /// Active investments with `maturity_date <= as_of`, oldest maturity first.
    async fn find_matured_active(&self, as_of: DateTime<Utc>) -> Result<Vec<Investment>>;

    /// A user's investments newest first.
    async fn investments_for_user(&self, user_id: Uuid, active_only: bool)
        -> Result<Vec<Investment>>;

    /// Appends an entry that does not move the balance (pending requests).
    async fn append_transaction(
        &self,
        transaction: NewWalletTransaction,
        now: DateTime<Utc>,
    ) -> Result<WalletTransaction>;

    async fn transaction(&self, transaction_id: Uuid) -> Result<Option<WalletTransaction>>;

    /// A user's history newest first.
    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>>;

    /// Pending deposits and withdrawals across all users, oldest first.
    async fn pending_transactions(&self) -> Result<Vec<WalletTransaction>>;

    async fn platform_stats(&self) -> Result<PlatformStats>;

    /// Debits the wallet, inserts the investment and the purchase entry.
    ///
    /// Fails with `Overdraft`, `DuplicateActiveInvestment` or
    /// `OneTimePlanUsed` without writing anything.
    async fn commit_purchase(&self, purchase: PurchaseCommit) -> Result<PurchaseReceipt>;

    /// Moves an active investment to completed, credits its payout and
    /// appends the return entry.
    ///
    /// Returns `None` without writing if the investment is no longer active,
    /// which makes repeated sweeps harmless.
    async fn commit_maturity(&self, maturity: MaturityCommit) -> Result<Option<MaturityReceipt>>;

    /// Applies an admin decision to a pending deposit or withdrawal.
    ///
    /// Returns `None` if the entry is no longer pending. An approved
    /// withdrawal the balance cannot cover fails with `Overdraft` and the
    /// entry stays pending.
    async fn commit_review(&self, review: ReviewCommit) -> Result<Option<ReviewReceipt>>;
}
