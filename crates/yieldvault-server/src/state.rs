//! Shared handler state.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::{ConfigError, SweepConfig};
use crate::jobs::MaturityScheduler;
use crate::locks::UserLocks;
use crate::services::{PlanCatalog, Portfolio, PurchaseEngine, WalletLedger};
use crate::store::LedgerStore;

#[derive(Clone)]
pub struct AppState {
    pub catalog: PlanCatalog,
    pub engine: PurchaseEngine,
    pub wallet: WalletLedger,
    pub portfolio: Portfolio,
    pub scheduler: Arc<MaturityScheduler>,
}

impl AppState {
    /// Wires every service to one store, one clock and one set of user locks.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        sweep: SweepConfig,
    ) -> Result<Self, ConfigError> {
        let locks = Arc::new(UserLocks::new());
        let scheduler = MaturityScheduler::new(store.clone(), locks.clone(), clock.clone(), sweep)?;
        Ok(Self {
            catalog: PlanCatalog::new(store.clone(), clock.clone()),
            engine: PurchaseEngine::new(store.clone(), locks.clone(), clock.clone()),
            wallet: WalletLedger::new(store.clone(), locks, clock.clone()),
            portfolio: Portfolio::new(store, clock),
            scheduler: Arc::new(scheduler),
        })
    }
}
