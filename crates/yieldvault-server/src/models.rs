//! Database models for the wallet ledger.

pub mod investment;
pub mod plan;
pub mod wallet;
pub mod wallet_transaction;

pub use investment::{Investment, InvestmentStatus, NewInvestment};
pub use plan::{DurationUnit, NewPlan, Plan, PlanCategory, PlanDuration, PlanUpdate};
pub use wallet::{BalanceOverflow, Overdraft, Wallet};
pub use wallet_transaction::{
    NewWalletTransaction, TransactionStatus, TransactionType, WalletTransaction,
};
