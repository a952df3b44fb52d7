//! PostgreSQL `LedgerStore`.
//!
//! Balance changes are conditional updates (`balance >= $amount`) executed
//! inside the same transaction as the records they pay for. The wallet row
//! lock taken by that update serializes concurrent commits for one user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    LedgerStore, MaturityCommit, MaturityReceipt, PlatformStats, PurchaseCommit, PurchaseReceipt,
    Result, ReviewCommit, ReviewReceipt, StoreError,
};
use crate::models::{
    BalanceOverflow, Investment, NewPlan, NewWalletTransaction, Overdraft, Plan, TransactionStatus,
    TransactionType, Wallet, WalletTransaction,
};

const PLAN_COLUMNS: &str = "id, title, description, category, amount, total_maturity_amount, \
     duration_value, duration_unit, is_active, one_time_only, created_at, updated_at";

const INVESTMENT_COLUMNS: &str = "id, user_id, plan_id, invested_amount, total_maturity_amount, \
     realized_payout, maturity_date, status, completed_at, created_at";

const TRANSACTION_COLUMNS: &str =
    "id, user_id, kind, amount, status, plan_id, description, proof, created_at";

/// Ledger store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

async fn insert_transaction(
    tx: &mut Transaction<'_, Postgres>,
    entry: &NewWalletTransaction,
    now: DateTime<Utc>,
) -> Result<WalletTransaction> {
    let stored: WalletTransaction = sqlx::query_as(&format!(
        r#"
        INSERT INTO wallet_transactions (id, user_id, kind, amount, status, plan_id, description, proof, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {TRANSACTION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.status)
    .bind(entry.plan_id)
    .bind(&entry.description)
    .bind(&entry.proof)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(stored)
}

/// Conditional debit. Distinguishes a missing wallet from a short balance.
async fn debit_wallet(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE wallets
        SET balance = balance - $1, updated_at = $2
        WHERE user_id = $3 AND balance >= $1
        RETURNING balance
        "#,
    )
    .bind(amount)
    .bind(now)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(balance) = balance {
        return Ok(balance);
    }

    let available: Option<i64> =
        sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    match available {
        Some(available) => Err(Overdraft {
            required: amount,
            available,
        }
        .into()),
        None => Err(StoreError::WalletNotFound(user_id)),
    }
}

/// Conditional credit. Refuses a payout the balance cannot hold instead of
/// letting the `BIGINT` overflow.
async fn credit_wallet(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE wallets
        SET balance = balance + $1, updated_at = $2
        WHERE user_id = $3 AND balance <= $4 - $1
        RETURNING balance
        "#,
    )
    .bind(amount)
    .bind(now)
    .bind(user_id)
    .bind(i64::MAX)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(balance) = balance {
        return Ok(balance);
    }

    let current: Option<i64> =
        sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    match current {
        Some(balance) => Err(BalanceOverflow { amount, balance }.into()),
        None => Err(StoreError::WalletNotFound(user_id)),
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn open_wallet(&self, user_id: Uuid, balance: i64, now: DateTime<Utc>) -> Result<Wallet> {
        sqlx::query_as(
            r#"
            INSERT INTO wallets (user_id, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING user_id, balance, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(balance)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::WalletExists(user_id)
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn wallet(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        Ok(sqlx::query_as(
            r#"
            SELECT user_id, balance, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_plan(&self, plan: NewPlan, now: DateTime<Utc>) -> Result<Plan> {
        Ok(sqlx::query_as(&format!(
            r#"
            INSERT INTO plans (id, title, description, category, amount, total_maturity_amount,
                               duration_value, duration_unit, is_active, one_time_only, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $10, $10)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&plan.title)
        .bind(&plan.description)
        .bind(plan.category)
        .bind(plan.amount)
        .bind(plan.total_maturity_amount)
        .bind(plan.duration.value)
        .bind(plan.duration.unit)
        .bind(plan.one_time_only)
        .bind(now)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn save_plan(&self, plan: &Plan) -> Result<Option<Plan>> {
        Ok(sqlx::query_as(&format!(
            r#"
            UPDATE plans
            SET title = $2, description = $3, category = $4, amount = $5,
                total_maturity_amount = $6, duration_value = $7, duration_unit = $8,
                is_active = $9, one_time_only = $10, updated_at = $11
            WHERE id = $1
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(plan.id)
        .bind(&plan.title)
        .bind(&plan.description)
        .bind(plan.category)
        .bind(plan.amount)
        .bind(plan.total_maturity_amount)
        .bind(plan.duration.value)
        .bind(plan.duration.unit)
        .bind(plan.is_active)
        .bind(plan.one_time_only)
        .bind(plan.updated_at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn toggle_plan_active(&self, plan_id: Uuid, now: DateTime<Utc>) -> Result<Option<Plan>> {
        Ok(sqlx::query_as(&format!(
            r#"
            UPDATE plans
            SET is_active = NOT is_active, updated_at = $2
            WHERE id = $1
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(plan_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_plan(&self, plan_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM plans WHERE id = $1 FOR UPDATE")
                .bind(plan_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let references: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM investments WHERE plan_id = $1")
                .bind(plan_id)
                .fetch_one(&mut *tx)
                .await?;
        if references > 0 {
            return Err(StoreError::PlanReferenced(plan_id));
        }

        sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(plan_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::PlanReferenced(plan_id)
                } else {
                    StoreError::Database(e)
                }
            })?;

        tx.commit().await?;
        Ok(true)
    }

    async fn plan(&self, plan_id: Uuid) -> Result<Option<Plan>> {
        Ok(sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn plans(&self, active_only: bool) -> Result<Vec<Plan>> {
        Ok(sqlx::query_as(&format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM plans
            WHERE is_active OR NOT $1
            ORDER BY created_at DESC, title
            "#
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn investment(&self, investment_id: Uuid) -> Result<Option<Investment>> {
        Ok(sqlx::query_as(&format!(
            "SELECT {INVESTMENT_COLUMNS} FROM investments WHERE id = $1"
        ))
        .bind(investment_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_active_by_user_and_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Investment>> {
        Ok(sqlx::query_as(&format!(
            r#"
            SELECT {INVESTMENT_COLUMNS}
            FROM investments
            WHERE user_id = $1 AND plan_id = $2 AND status = 'active'
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_any_by_user_and_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Investment>> {
        Ok(sqlx::query_as(&format!(
            r#"
            SELECT {INVESTMENT_COLUMNS}
            FROM investments
            WHERE user_id = $1 AND plan_id = $2
            ORDER BY created_at
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_matured_active(&self, as_of: DateTime<Utc>) -> Result<Vec<Investment>> {
        Ok(sqlx::query_as(&format!(
            r#"
            SELECT {INVESTMENT_COLUMNS}
            FROM investments
            WHERE status = 'active' AND maturity_date <= $1
            ORDER BY maturity_date
            "#
        ))
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn investments_for_user(
        &self,
        user_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Investment>> {
        Ok(sqlx::query_as(&format!(
            r#"
            SELECT {INVESTMENT_COLUMNS}
            FROM investments
            WHERE user_id = $1 AND (status = 'active' OR NOT $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn append_transaction(
        &self,
        transaction: NewWalletTransaction,
        now: DateTime<Utc>,
    ) -> Result<WalletTransaction> {
        let mut tx = self.pool.begin().await?;
        let stored = insert_transaction(&mut tx, &transaction, now)
            .await
            .map_err(|e| match e {
                StoreError::Database(db) if is_foreign_key_violation(&db) => {
                    StoreError::WalletNotFound(transaction.user_id)
                }
                other => other,
            })?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn transaction(&self, transaction_id: Uuid) -> Result<Option<WalletTransaction>> {
        Ok(sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions WHERE id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>> {
        Ok(sqlx::query_as(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn pending_transactions(&self) -> Result<Vec<WalletTransaction>> {
        Ok(sqlx::query_as(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM wallet_transactions
            WHERE status = 'pending'
            ORDER BY created_at
            "#
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn platform_stats(&self) -> Result<PlatformStats> {
        Ok(sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM wallets) AS total_users,
                (SELECT COUNT(*) FROM investments) AS total_investments,
                (SELECT COUNT(*) FROM investments WHERE status = 'active') AS active_investments,
                (SELECT COUNT(*) FROM wallet_transactions
                    WHERE kind = 'deposit' AND status = 'pending') AS pending_deposits,
                (SELECT COUNT(*) FROM wallet_transactions
                    WHERE kind = 'withdrawal' AND status = 'pending') AS pending_withdrawals,
                (SELECT COALESCE(SUM(invested_amount), 0)::BIGINT FROM investments)
                    AS total_invested_amount
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }

    async fn commit_purchase(&self, purchase: PurchaseCommit) -> Result<PurchaseReceipt> {
        let user_id = purchase.investment.user_id;
        let plan_id = purchase.investment.plan_id;
        let mut tx = self.pool.begin().await?;

        // Holds the wallet row lock until commit.
        let balance = debit_wallet(
            &mut tx,
            user_id,
            purchase.investment.invested_amount,
            purchase.now,
        )
        .await?;

        if purchase.one_time_only {
            let used: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM investments WHERE user_id = $1 AND plan_id = $2)",
            )
            .bind(user_id)
            .bind(plan_id)
            .fetch_one(&mut *tx)
            .await?;
            if used {
                return Err(StoreError::OneTimePlanUsed);
            }
        }

        let new_investment = &purchase.investment;
        let investment: Investment = sqlx::query_as(&format!(
            r#"
            INSERT INTO investments (id, user_id, plan_id, invested_amount, total_maturity_amount,
                                     maturity_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'active', $7)
            RETURNING {INVESTMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(plan_id)
        .bind(new_investment.invested_amount)
        .bind(new_investment.total_maturity_amount)
        .bind(new_investment.maturity_date)
        .bind(purchase.now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateActiveInvestment
            } else {
                StoreError::Database(e)
            }
        })?;

        let transaction = insert_transaction(&mut tx, &purchase.transaction, purchase.now).await?;

        tx.commit().await?;

        Ok(PurchaseReceipt {
            investment,
            transaction,
            balance,
        })
    }

    async fn commit_maturity(&self, maturity: MaturityCommit) -> Result<Option<MaturityReceipt>> {
        let mut tx = self.pool.begin().await?;

        // The status guard makes this a compare-and-set: a second caller
        // matches no row and leaves without crediting.
        let investment: Option<Investment> = sqlx::query_as(&format!(
            r#"
            UPDATE investments
            SET status = 'completed', completed_at = $2, realized_payout = total_maturity_amount
            WHERE id = $1 AND status = 'active'
            RETURNING {INVESTMENT_COLUMNS}
            "#
        ))
        .bind(maturity.investment_id)
        .bind(maturity.now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(investment) = investment else {
            return Ok(None);
        };

        let payout = investment.total_maturity_amount;
        let balance = credit_wallet(&mut tx, investment.user_id, payout, maturity.now).await?;
        let entry = NewWalletTransaction {
            amount: payout,
            ..maturity.transaction
        };
        let transaction = insert_transaction(&mut tx, &entry, maturity.now).await?;

        tx.commit().await?;

        Ok(Some(MaturityReceipt {
            investment,
            transaction,
            balance,
        }))
    }

    async fn commit_review(&self, review: ReviewCommit) -> Result<Option<ReviewReceipt>> {
        let mut tx = self.pool.begin().await?;

        let transaction: Option<WalletTransaction> = sqlx::query_as(&format!(
            r#"
            UPDATE wallet_transactions
            SET status = $2
            WHERE id = $1 AND status = 'pending' AND kind IN ('deposit', 'withdrawal')
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(review.transaction_id)
        .bind(review.decision)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(transaction) = transaction else {
            return Ok(None);
        };

        let balance = match (review.decision, transaction.kind) {
            (TransactionStatus::Approved, TransactionType::Deposit) => {
                credit_wallet(&mut tx, transaction.user_id, transaction.amount, review.now).await?
            }
            (TransactionStatus::Approved, TransactionType::Withdrawal) => {
                debit_wallet(&mut tx, transaction.user_id, transaction.amount, review.now).await?
            }
            _ => sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
                .bind(transaction.user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::WalletNotFound(transaction.user_id))?,
        };

        tx.commit().await?;

        Ok(Some(ReviewReceipt {
            transaction,
            balance,
        }))
    }
}
