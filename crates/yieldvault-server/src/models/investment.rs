//! Investment model: one purchase of a plan and its maturity timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

const SECONDS_PER_DAY: i64 = 86_400;

/// Possible states of an investment in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "investment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvestmentStatus {
    /// Principal is locked until the maturity date.
    Active,
    /// Payout has been credited to the wallet. Terminal.
    Completed,
    /// Reserved for manual intervention; never produced by the ledger itself.
    Cancelled,
}

/// Represents a user's investment in a plan.
///
/// Amounts are snapshots taken at purchase time, so later plan edits never
/// change what an existing investment pays out.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    /// Unique identifier for this investment.
    pub id: Uuid,
    /// Owner of the investment.
    pub user_id: Uuid,
    /// Plan this investment was bought from.
    pub plan_id: Uuid,
    /// Principal debited at purchase.
    pub invested_amount: i64,
    /// Payout promised at maturity.
    pub total_maturity_amount: i64,
    /// Payout actually credited (null until matured).
    pub realized_payout: Option<i64>,
    /// When the investment becomes eligible for payout.
    pub maturity_date: DateTime<Utc>,
    pub status: InvestmentStatus,
    /// When the payout was credited (null while active).
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new investment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvestment {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub invested_amount: i64,
    pub total_maturity_amount: i64,
    pub maturity_date: DateTime<Utc>,
}

impl Investment {
    pub fn is_active(&self) -> bool {
        self.status == InvestmentStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.status == InvestmentStatus::Completed
    }

    /// Profit promised on top of the principal.
    pub fn profit_amount(&self) -> i64 {
        self.total_maturity_amount - self.invested_amount
    }

    /// True once `as_of` has reached the maturity date (inclusive).
    pub fn is_matured(&self, as_of: DateTime<Utc>) -> bool {
        self.maturity_date <= as_of
    }

    /// Whole days left until maturity, rounded up. Zero once not active.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_active() {
            return 0;
        }
        let seconds = (self.maturity_date - now).num_seconds();
        if seconds <= 0 {
            return 0;
        }
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }

    /// Share of the term elapsed, clamped to 0..=100. Always 100 once not active.
    pub fn progress_percent(&self, now: DateTime<Utc>) -> f64 {
        if !self.is_active() {
            return 100.0;
        }
        let total = (self.maturity_date - self.created_at).num_milliseconds();
        if total <= 0 {
            return 100.0;
        }
        let elapsed = (now - self.created_at).num_milliseconds();
        (elapsed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

impl NewInvestment {
    pub fn new(
        user_id: Uuid,
        plan_id: Uuid,
        invested_amount: i64,
        total_maturity_amount: i64,
        maturity_date: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            plan_id,
            invested_amount,
            total_maturity_amount,
            maturity_date,
        }
    }

    /// Materializes the record as stored: active, no payout yet.
    pub fn into_investment(self, id: Uuid, created_at: DateTime<Utc>) -> Investment {
        Investment {
            id,
            user_id: self.user_id,
            plan_id: self.plan_id,
            invested_amount: self.invested_amount,
            total_maturity_amount: self.total_maturity_amount,
            realized_payout: None,
            maturity_date: self.maturity_date,
            status: InvestmentStatus::Active,
            completed_at: None,
            created_at,
        }
    }
}
