//! In-memory `LedgerStore` for tests and local runs.
//!
//! All state lives behind one mutex. Commits stage their writes on copies
//! and publish them only once every step has succeeded, which gives the same
//! all-or-nothing behaviour as a database transaction.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use super::{
    LedgerStore, MaturityCommit, MaturityReceipt, PlatformStats, PurchaseCommit, PurchaseReceipt,
    Result, ReviewCommit, ReviewReceipt, StoreError,
};
use crate::models::{
    Investment, InvestmentStatus, NewPlan, NewWalletTransaction, Plan, TransactionStatus,
    TransactionType, Wallet, WalletTransaction,
};

#[derive(Default)]
struct State {
    wallets: HashMap<Uuid, Wallet>,
    plans: HashMap<Uuid, Plan>,
    /// Insertion order doubles as creation order.
    investments: Vec<Investment>,
    transactions: Vec<WalletTransaction>,
}

/// Injected failures for exercising rollback and timeout paths.
#[derive(Default)]
struct Faults {
    fail_purchase_after_debit: bool,
    fail_maturity: HashSet<Uuid>,
    delay_maturity: HashMap<Uuid, Duration>,
}

/// Ledger store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
    faults: RwLock<Faults>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes purchase commits fail after the debit has been staged.
    pub fn set_fail_purchase_after_debit(&self, fail: bool) {
        self.faults.write().fail_purchase_after_debit = fail;
    }

    /// Makes the maturity commit for one investment fail after its status
    /// change and credit have been staged.
    pub fn set_fail_maturity(&self, investment_id: Uuid, fail: bool) {
        let mut faults = self.faults.write();
        if fail {
            faults.fail_maturity.insert(investment_id);
        } else {
            faults.fail_maturity.remove(&investment_id);
        }
    }

    /// Delays the maturity commit for one investment before it starts.
    pub fn set_maturity_delay(&self, investment_id: Uuid, delay: Duration) {
        self.faults
            .write()
            .delay_maturity
            .insert(investment_id, delay);
    }

    /// Inserts an investment as-is, bypassing the purchase flow.
    pub fn seed_investment(&self, investment: Investment) {
        self.state.lock().investments.push(investment);
    }
}

fn push_transaction(
    transactions: &mut Vec<WalletTransaction>,
    transaction: NewWalletTransaction,
    now: DateTime<Utc>,
) -> WalletTransaction {
    let stored = transaction.into_transaction(Uuid::new_v4(), now);
    transactions.push(stored.clone());
    stored
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn open_wallet(&self, user_id: Uuid, balance: i64, now: DateTime<Utc>) -> Result<Wallet> {
        let mut state = self.state.lock();
        if state.wallets.contains_key(&user_id) {
            return Err(StoreError::WalletExists(user_id));
        }
        let wallet = Wallet::new(user_id, balance, now);
        state.wallets.insert(user_id, wallet.clone());
        Ok(wallet)
    }

    async fn wallet(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        Ok(self.state.lock().wallets.get(&user_id).cloned())
    }

    async fn insert_plan(&self, plan: NewPlan, now: DateTime<Utc>) -> Result<Plan> {
        let stored = Plan {
            id: Uuid::new_v4(),
            title: plan.title,
            description: plan.description,
            category: plan.category,
            amount: plan.amount,
            total_maturity_amount: plan.total_maturity_amount,
            duration: plan.duration,
            is_active: true,
            one_time_only: plan.one_time_only,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().plans.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save_plan(&self, plan: &Plan) -> Result<Option<Plan>> {
        let mut state = self.state.lock();
        match state.plans.get_mut(&plan.id) {
            Some(existing) => {
                *existing = Plan {
                    created_at: existing.created_at,
                    ..plan.clone()
                };
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn toggle_plan_active(&self, plan_id: Uuid, now: DateTime<Utc>) -> Result<Option<Plan>> {
        let mut state = self.state.lock();
        Ok(state.plans.get_mut(&plan_id).map(|plan| {
            plan.is_active = !plan.is_active;
            plan.updated_at = now;
            plan.clone()
        }))
    }

    async fn delete_plan(&self, plan_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock();
        if !state.plans.contains_key(&plan_id) {
            return Ok(false);
        }
        if state.investments.iter().any(|inv| inv.plan_id == plan_id) {
            return Err(StoreError::PlanReferenced(plan_id));
        }
        state.plans.remove(&plan_id);
        Ok(true)
    }

    async fn plan(&self, plan_id: Uuid) -> Result<Option<Plan>> {
        Ok(self.state.lock().plans.get(&plan_id).cloned())
    }

    async fn plans(&self, active_only: bool) -> Result<Vec<Plan>> {
        let state = self.state.lock();
        let mut plans: Vec<Plan> = state
            .plans
            .values()
            .filter(|plan| !active_only || plan.is_active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.title.cmp(&b.title)));
        Ok(plans)
    }

    async fn investment(&self, investment_id: Uuid) -> Result<Option<Investment>> {
        let state = self.state.lock();
        Ok(state
            .investments
            .iter()
            .find(|inv| inv.id == investment_id)
            .cloned())
    }

    async fn find_active_by_user_and_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Investment>> {
        let state = self.state.lock();
        Ok(state
            .investments
            .iter()
            .find(|inv| inv.user_id == user_id && inv.plan_id == plan_id && inv.is_active())
            .cloned())
    }

    async fn find_any_by_user_and_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Investment>> {
        let state = self.state.lock();
        Ok(state
            .investments
            .iter()
            .find(|inv| inv.user_id == user_id && inv.plan_id == plan_id)
            .cloned())
    }

    async fn find_matured_active(&self, as_of: DateTime<Utc>) -> Result<Vec<Investment>> {
        let state = self.state.lock();
        let mut matured: Vec<Investment> = state
            .investments
            .iter()
            .filter(|inv| inv.is_active() && inv.is_matured(as_of))
            .cloned()
            .collect();
        matured.sort_by_key(|inv| inv.maturity_date);
        Ok(matured)
    }

    async fn investments_for_user(
        &self,
        user_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Investment>> {
        let state = self.state.lock();
        Ok(state
            .investments
            .iter()
            .rev()
            .filter(|inv| inv.user_id == user_id && (!active_only || inv.is_active()))
            .cloned()
            .collect())
    }

    async fn append_transaction(
        &self,
        transaction: NewWalletTransaction,
        now: DateTime<Utc>,
    ) -> Result<WalletTransaction> {
        let mut state = self.state.lock();
        if !state.wallets.contains_key(&transaction.user_id) {
            return Err(StoreError::WalletNotFound(transaction.user_id));
        }
        Ok(push_transaction(&mut state.transactions, transaction, now))
    }

    async fn transaction(&self, transaction_id: Uuid) -> Result<Option<WalletTransaction>> {
        let state = self.state.lock();
        Ok(state
            .transactions
            .iter()
            .find(|tx| tx.id == transaction_id)
            .cloned())
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>> {
        let state = self.state.lock();
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn pending_transactions(&self) -> Result<Vec<WalletTransaction>> {
        let state = self.state.lock();
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.is_pending())
            .cloned()
            .collect())
    }

    async fn platform_stats(&self) -> Result<PlatformStats> {
        let state = self.state.lock();
        let pending = |kind: TransactionType| {
            state
                .transactions
                .iter()
                .filter(|tx| tx.kind == kind && tx.is_pending())
                .count() as i64
        };
        let active = state.investments.iter().filter(|inv| inv.is_active()).count();
        Ok(PlatformStats {
            total_users: state.wallets.len() as i64,
            total_investments: state.investments.len() as i64,
            active_investments: active as i64,
            pending_deposits: pending(TransactionType::Deposit),
            pending_withdrawals: pending(TransactionType::Withdrawal),
            total_invested_amount: state
                .investments
                .iter()
                .fold(0i64, |sum, inv| sum.saturating_add(inv.invested_amount)),
        })
    }

    async fn commit_purchase(&self, purchase: PurchaseCommit) -> Result<PurchaseReceipt> {
        let mut state = self.state.lock();
        let new_investment = purchase.investment;
        let user_id = new_investment.user_id;
        let plan_id = new_investment.plan_id;

        let mut wallet = state
            .wallets
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::WalletNotFound(user_id))?;

        let existing = state
            .investments
            .iter()
            .filter(|inv| inv.user_id == user_id && inv.plan_id == plan_id);
        for investment in existing {
            if investment.is_active() {
                return Err(StoreError::DuplicateActiveInvestment);
            }
            if purchase.one_time_only {
                return Err(StoreError::OneTimePlanUsed);
            }
        }

        let balance = wallet.debit(new_investment.invested_amount, purchase.now)?;

        if self.faults.read().fail_purchase_after_debit {
            return Err(StoreError::Unavailable(
                "injected failure after debit".to_string(),
            ));
        }

        let investment = new_investment.into_investment(Uuid::new_v4(), purchase.now);
        state.wallets.insert(user_id, wallet);
        state.investments.push(investment.clone());
        let transaction =
            push_transaction(&mut state.transactions, purchase.transaction, purchase.now);

        Ok(PurchaseReceipt {
            investment,
            transaction,
            balance,
        })
    }

    async fn commit_maturity(&self, maturity: MaturityCommit) -> Result<Option<MaturityReceipt>> {
        let delay = self
            .faults
            .read()
            .delay_maturity
            .get(&maturity.investment_id)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let Some(index) = state
            .investments
            .iter()
            .position(|inv| inv.id == maturity.investment_id && inv.is_active())
        else {
            return Ok(None);
        };

        let mut investment = state.investments[index].clone();
        let payout = investment.total_maturity_amount;
        investment.status = InvestmentStatus::Completed;
        investment.completed_at = Some(maturity.now);
        investment.realized_payout = Some(payout);

        let mut wallet = state
            .wallets
            .get(&investment.user_id)
            .cloned()
            .ok_or(StoreError::WalletNotFound(investment.user_id))?;
        let balance = wallet.credit(payout, maturity.now)?;

        if self.faults.read().fail_maturity.contains(&investment.id) {
            return Err(StoreError::Unavailable(
                "injected failure after credit".to_string(),
            ));
        }

        state.investments[index] = investment.clone();
        state.wallets.insert(investment.user_id, wallet);
        let transaction = push_transaction(
            &mut state.transactions,
            NewWalletTransaction {
                amount: payout,
                ..maturity.transaction
            },
            maturity.now,
        );

        Ok(Some(MaturityReceipt {
            investment,
            transaction,
            balance,
        }))
    }

    async fn commit_review(&self, review: ReviewCommit) -> Result<Option<ReviewReceipt>> {
        let mut state = self.state.lock();
        let Some(index) = state
            .transactions
            .iter()
            .position(|tx| tx.id == review.transaction_id && tx.is_pending())
        else {
            return Ok(None);
        };

        let mut transaction = state.transactions[index].clone();
        let mut wallet = state
            .wallets
            .get(&transaction.user_id)
            .cloned()
            .ok_or(StoreError::WalletNotFound(transaction.user_id))?;

        if review.decision == TransactionStatus::Approved {
            match transaction.kind {
                TransactionType::Deposit => {
                    wallet.credit(transaction.amount, review.now)?;
                }
                TransactionType::Withdrawal => {
                    wallet.debit(transaction.amount, review.now)?;
                }
                TransactionType::Purchase | TransactionType::Return => return Ok(None),
            }
        }

        transaction.status = review.decision;
        let balance = wallet.balance;
        state.transactions[index] = transaction.clone();
        state.wallets.insert(wallet.user_id, wallet);

        Ok(Some(ReviewReceipt {
            transaction,
            balance,
        }))
    }
}
