//! Read-only projections of a user's investments and history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::{Investment, Plan, WalletTransaction};
use crate::store::{LedgerStore, PlatformStats};

/// Entries shown on the dashboard.
pub const RECENT_TRANSACTIONS: i64 = 10;

/// An investment joined with its plan and timeline figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentView {
    #[serde(flatten)]
    pub investment: Investment,
    pub plan: Option<Plan>,
    pub profit_amount: i64,
    pub days_remaining: i64,
    pub progress_percent: f64,
}

impl InvestmentView {
    pub fn new(investment: Investment, plan: Option<Plan>, now: DateTime<Utc>) -> Self {
        Self {
            profit_amount: investment.profit_amount(),
            days_remaining: investment.days_remaining(now),
            progress_percent: investment.progress_percent(now),
            plan,
            investment,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub wallet_balance: i64,
    /// Principal across every investment, matured ones included.
    pub total_invested: i64,
    pub active_investments: usize,
    pub investments: Vec<InvestmentView>,
    pub recent_transactions: Vec<WalletTransaction>,
}

#[derive(Clone)]
pub struct Portfolio {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl Portfolio {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// A user's investments newest first, optionally only active ones.
    pub async fn investments(
        &self,
        user_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<InvestmentView>, AppError> {
        let investments = self.store.investments_for_user(user_id, active_only).await?;
        self.with_plans(investments).await
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<Dashboard, AppError> {
        let wallet = self
            .store
            .wallet(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet not found for user {}", user_id)))?;
        let investments = self.investments(user_id, false).await?;
        let recent_transactions = self
            .store
            .transactions_for_user(user_id, Some(RECENT_TRANSACTIONS))
            .await?;

        Ok(Dashboard {
            wallet_balance: wallet.balance,
            total_invested: investments
                .iter()
                .map(|view| view.investment.invested_amount)
                .sum(),
            active_investments: investments
                .iter()
                .filter(|view| view.investment.is_active())
                .count(),
            investments,
            recent_transactions,
        })
    }

    /// Totals across every user, for the admin dashboard.
    pub async fn platform_stats(&self) -> Result<PlatformStats, AppError> {
        Ok(self.store.platform_stats().await?)
    }

    async fn with_plans(
        &self,
        investments: Vec<Investment>,
    ) -> Result<Vec<InvestmentView>, AppError> {
        let plans: HashMap<Uuid, Plan> = self
            .store
            .plans(false)
            .await?
            .into_iter()
            .map(|plan| (plan.id, plan))
            .collect();
        let now = self.clock.now();
        Ok(investments
            .into_iter()
            .map(|investment| {
                let plan = plans.get(&investment.plan_id).cloned();
                InvestmentView::new(investment, plan, now)
            })
            .collect())
    }
}
