//! Investment plan model for the plan catalog.

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Fixed grouping of plans. Purely descriptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "plan_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanCategory {
    Silver,
    Gold,
    Diamond,
    AiRobot,
}

impl PlanCategory {
    /// All categories in display order.
    pub const ALL: [PlanCategory; 4] = [
        PlanCategory::Silver,
        PlanCategory::Gold,
        PlanCategory::Diamond,
        PlanCategory::AiRobot,
    ];

    /// Human-readable category name.
    pub fn label(&self) -> &'static str {
        match self {
            PlanCategory::Silver => "Silver",
            PlanCategory::Gold => "Gold",
            PlanCategory::Diamond => "Diamond",
            PlanCategory::AiRobot => "AI Robot",
        }
    }
}

/// Unit of a plan duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "duration_unit", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Months,
    Years,
}

/// Length of an investment term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlanDuration {
    #[sqlx(rename = "duration_value")]
    pub value: i32,
    #[sqlx(rename = "duration_unit")]
    pub unit: DurationUnit,
}

impl PlanDuration {
    pub fn new(value: i32, unit: DurationUnit) -> Self {
        Self { value, unit }
    }

    /// Approximate length in days (30-day months, 365-day years).
    pub fn in_days(&self) -> i64 {
        let value = i64::from(self.value);
        match self.unit {
            DurationUnit::Days => value,
            DurationUnit::Months => value * 30,
            DurationUnit::Years => value * 365,
        }
    }

    /// Adds this duration to `start` using calendar arithmetic.
    ///
    /// Months and years clamp to the last day of the target month, so
    /// Jan 31 + 1 month is Feb 28 (or 29) and Feb 29 + 1 year is Feb 28.
    /// Returns `None` on a non-positive value or overflow.
    pub fn add_to(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.value <= 0 {
            return None;
        }
        let value = self.value as u32;
        match self.unit {
            DurationUnit::Days => start.checked_add_days(Days::new(u64::from(value))),
            DurationUnit::Months => start.checked_add_months(Months::new(value)),
            DurationUnit::Years => start.checked_add_months(Months::new(value.checked_mul(12)?)),
        }
    }
}

/// Represents an investment plan in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: PlanCategory,
    /// Principal charged on purchase.
    pub amount: i64,
    /// Amount credited back at maturity (principal plus profit).
    pub total_maturity_amount: i64,
    #[sqlx(flatten)]
    pub duration: PlanDuration,
    pub is_active: bool,
    /// A one-time plan may be bought at most once per user, ever.
    pub one_time_only: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Profit promised at maturity.
    pub fn profit_amount(&self) -> i64 {
        self.total_maturity_amount - self.amount
    }

    pub fn duration_in_days(&self) -> i64 {
        self.duration.in_days()
    }

    /// Profit as a percentage of principal, two decimal places.
    pub fn return_percent(&self) -> BigDecimal {
        return_percent(self.amount, self.total_maturity_amount)
    }
}

/// Profit over principal as a percentage, rounded half-up to two decimals.
pub fn return_percent(amount: i64, total_maturity_amount: i64) -> BigDecimal {
    if amount <= 0 {
        return BigDecimal::from(0);
    }
    let profit = BigDecimal::from(total_maturity_amount - amount);
    (profit * BigDecimal::from(100) / BigDecimal::from(amount))
        .with_scale_round(2, RoundingMode::HalfUp)
}

/// Data required to create a new plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    pub title: String,
    pub description: String,
    pub category: PlanCategory,
    pub amount: i64,
    pub total_maturity_amount: i64,
    pub duration: PlanDuration,
    #[serde(default)]
    pub one_time_only: bool,
}

impl NewPlan {
    /// Checks the catalog invariants before anything is stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Plan title is required".to_string());
        }
        validate_terms(self.amount, self.total_maturity_amount, &self.duration)
    }
}

/// Partial update of a plan. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<PlanCategory>,
    pub amount: Option<i64>,
    pub total_maturity_amount: Option<i64>,
    pub duration: Option<PlanDuration>,
    pub is_active: Option<bool>,
    pub one_time_only: Option<bool>,
}

impl PlanUpdate {
    /// Applies the update on top of `plan`, validating the resulting terms.
    pub fn apply(&self, plan: &Plan, now: DateTime<Utc>) -> Result<Plan, String> {
        let updated = Plan {
            id: plan.id,
            title: self.title.clone().unwrap_or_else(|| plan.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| plan.description.clone()),
            category: self.category.unwrap_or(plan.category),
            amount: self.amount.unwrap_or(plan.amount),
            total_maturity_amount: self
                .total_maturity_amount
                .unwrap_or(plan.total_maturity_amount),
            duration: self.duration.unwrap_or(plan.duration),
            is_active: self.is_active.unwrap_or(plan.is_active),
            one_time_only: self.one_time_only.unwrap_or(plan.one_time_only),
            created_at: plan.created_at,
            updated_at: now,
        };
        if updated.title.trim().is_empty() {
            return Err("Plan title is required".to_string());
        }
        validate_terms(
            updated.amount,
            updated.total_maturity_amount,
            &updated.duration,
        )?;
        Ok(updated)
    }
}

fn validate_terms(amount: i64, total: i64, duration: &PlanDuration) -> Result<(), String> {
    if amount <= 0 {
        return Err("Plan amount must be positive".to_string());
    }
    if total <= amount {
        return Err("Total maturity amount must be greater than the plan amount".to_string());
    }
    if duration.value <= 0 {
        return Err("Duration must be positive".to_string());
    }
    Ok(())
}
