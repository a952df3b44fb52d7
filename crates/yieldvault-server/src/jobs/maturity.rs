//! Maturity sweep: pays out investments whose term has ended.
//!
//! Each sweep settles every active investment with `maturity_date <= now`.
//! Settlement flips the status, credits the payout and appends the return
//! entry in one store commit, so a repeated or overlapping sweep can never
//! credit the same investment twice. Items are settled independently; a
//! failure or timeout leaves that investment active for the next sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{ConfigError, SweepConfig};
use crate::error::AppError;
use crate::locks::UserLocks;
use crate::models::{Investment, NewWalletTransaction};
use crate::store::{LedgerStore, MaturityCommit, MaturityReceipt};

/// Outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub as_of: DateTime<Utc>,
    /// Matured active investments the sweep started with.
    pub found: usize,
    pub completed: usize,
    /// Already settled by someone else by the time we got to them.
    pub skipped: usize,
    pub failed: usize,
    /// Sum of payouts credited.
    pub credited: i64,
}

struct Runner {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct MaturityScheduler {
    store: Arc<dyn LedgerStore>,
    locks: Arc<UserLocks>,
    clock: Arc<dyn Clock>,
    config: SweepConfig,
    runner: Mutex<Option<Runner>>,
}

impl MaturityScheduler {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        locks: Arc<UserLocks>,
        clock: Arc<dyn Clock>,
        config: SweepConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            locks,
            clock,
            config,
            runner: Mutex::new(None),
        })
    }

    pub fn config(&self) -> SweepConfig {
        self.config
    }

    /// Spawns the sweep loop. The first sweep runs immediately.
    ///
    /// Returns `false` if the loop is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut runner = self.runner.lock();
        if runner.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(self).run_loop(shutdown_rx));
        *runner = Some(Runner { shutdown, handle });

        info!(
            interval_secs = self.config.interval.as_secs(),
            item_timeout_secs = self.config.item_timeout.as_secs(),
            "Maturity scheduler started"
        );
        true
    }

    /// Signals the loop to stop and waits for it. A sweep in progress is
    /// allowed to finish first.
    ///
    /// Returns `false` if the loop was not running.
    pub async fn stop(&self) -> bool {
        let Some(runner) = self.runner.lock().take() else {
            return false;
        };
        let _ = runner.shutdown.send(true);
        if let Err(e) = runner.handle.await {
            error!(error = %e, "Maturity scheduler task ended abnormally");
        }
        info!("Maturity scheduler stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.runner
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        // Next tick retries
                        error!(error = %e, "Maturity sweep failed");
                    }
                }
            }
        }
    }

    /// Runs a single sweep against the current time.
    pub async fn run_once(&self) -> Result<SweepReport, AppError> {
        let as_of = self.clock.now();
        let matured = self.store.find_matured_active(as_of).await?;

        let mut report = SweepReport {
            as_of,
            found: matured.len(),
            completed: 0,
            skipped: 0,
            failed: 0,
            credited: 0,
        };
        if matured.is_empty() {
            debug!(as_of = %as_of, "No matured investments");
            return Ok(report);
        }
        info!(as_of = %as_of, count = matured.len(), "Settling matured investments");

        for investment in matured {
            let investment_id = investment.id;
            let user_id = investment.user_id;
            match timeout(self.config.item_timeout, self.settle(investment)).await {
                Ok(Ok(Some(receipt))) => {
                    report.completed += 1;
                    report.credited = report.credited.saturating_add(receipt.transaction.amount);
                    info!(
                        investment_id = %investment_id,
                        user_id = %user_id,
                        payout = receipt.transaction.amount,
                        balance = receipt.balance,
                        "Investment matured"
                    );
                }
                Ok(Ok(None)) => {
                    report.skipped += 1;
                    debug!(investment_id = %investment_id, "Investment already settled");
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!(
                        investment_id = %investment_id,
                        error = %e,
                        "Failed to settle investment"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    warn!(
                        investment_id = %investment_id,
                        timeout_ms = self.config.item_timeout.as_millis() as u64,
                        "Settling investment timed out"
                    );
                }
            }
        }

        info!(
            found = report.found,
            completed = report.completed,
            skipped = report.skipped,
            failed = report.failed,
            credited = report.credited,
            "Maturity sweep finished"
        );
        Ok(report)
    }

    async fn settle(&self, investment: Investment) -> Result<Option<MaturityReceipt>, AppError> {
        let _guard = self.locks.lock(investment.user_id).await;

        let title = match self.store.plan(investment.plan_id).await? {
            Some(plan) => plan.title,
            None => "plan".to_string(),
        };
        let description = format!(
            "Investment matured: {} - Principal: ₹{} + Profit: ₹{}",
            title,
            investment.invested_amount,
            investment.profit_amount()
        );

        let receipt = self
            .store
            .commit_maturity(MaturityCommit {
                investment_id: investment.id,
                transaction: NewWalletTransaction::maturity_return(
                    investment.user_id,
                    investment.plan_id,
                    investment.total_maturity_amount,
                    description,
                ),
                now: self.clock.now(),
            })
            .await?;
        Ok(receipt)
    }
}
