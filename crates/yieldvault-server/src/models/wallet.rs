//! Wallet model holding a user's spendable balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Raised when a debit would take a balance below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("insufficient balance: required {required}, available {available}")]
pub struct Overdraft {
    pub required: i64,
    pub available: i64,
}

/// Raised when a credit would push a balance past the representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("credit of {amount} would overflow balance {balance}")]
pub struct BalanceOverflow {
    pub amount: i64,
    pub balance: i64,
}

/// Represents a user's wallet.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Owner of the wallet; one wallet per user.
    pub user_id: Uuid,
    /// Spendable balance in whole currency units. Never negative.
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: Uuid, balance: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the wallet can cover the given amount.
    pub fn has_sufficient_balance(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    /// Removes `amount` from the balance, refusing to go negative.
    pub fn debit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<i64, Overdraft> {
        if !self.has_sufficient_balance(amount) {
            return Err(Overdraft {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.updated_at = now;
        Ok(self.balance)
    }

    /// Adds exactly `amount` to the balance, or leaves it untouched.
    pub fn credit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<i64, BalanceOverflow> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(BalanceOverflow {
                amount,
                balance: self.balance,
            })?;
        self.updated_at = now;
        Ok(self.balance)
    }
}
