//! Business operations layered over a `LedgerStore`.

pub mod catalog;
pub mod portfolio;
pub mod purchase;
pub mod wallet;

pub use catalog::{PlanCatalog, PlanView};
pub use portfolio::{Dashboard, InvestmentView, Portfolio};
pub use purchase::{PurchaseEngine, PurchaseOutcome};
pub use wallet::{ReviewDecision, WalletLedger};
