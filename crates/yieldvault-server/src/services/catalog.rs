//! Plan catalog: admin management and the user-facing plan listing.

use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::{NewPlan, Plan, PlanUpdate};
use crate::store::LedgerStore;

/// A plan with its derived, never-persisted fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: Plan,
    pub duration_in_days: i64,
    pub return_percent: BigDecimal,
    pub profit_amount: i64,
    /// Only present when listing for a specific user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
}

impl PlanView {
    pub fn new(plan: Plan) -> Self {
        Self {
            duration_in_days: plan.duration_in_days(),
            return_percent: plan.return_percent(),
            profit_amount: plan.profit_amount(),
            is_locked: None,
            plan,
        }
    }

    fn locked(mut self, locked: bool) -> Self {
        self.is_locked = Some(locked);
        self
    }
}

#[derive(Clone)]
pub struct PlanCatalog {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl PlanCatalog {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Active plans, newest first.
    pub async fn list_active(&self) -> Result<Vec<Plan>, AppError> {
        Ok(self.store.plans(true).await?)
    }

    /// Every plan including inactive ones, for the admin view.
    pub async fn list_all(&self) -> Result<Vec<Plan>, AppError> {
        Ok(self.store.plans(false).await?)
    }

    pub async fn get(&self, plan_id: Uuid) -> Result<Plan, AppError> {
        self.store
            .plan(plan_id)
            .await?
            .ok_or(AppError::PlanNotFound)
    }

    /// Active plans annotated for `user_id`.
    ///
    /// A plan is locked while the user holds an active investment in it, and
    /// forever once a one-time plan has been bought.
    pub async fn plans_with_lock_status(&self, user_id: Uuid) -> Result<Vec<PlanView>, AppError> {
        let plans = self.store.plans(true).await?;
        let investments = self.store.investments_for_user(user_id, false).await?;

        let active: HashSet<Uuid> = investments
            .iter()
            .filter(|inv| inv.is_active())
            .map(|inv| inv.plan_id)
            .collect();
        let ever: HashSet<Uuid> = investments.iter().map(|inv| inv.plan_id).collect();

        Ok(plans
            .into_iter()
            .map(|plan| {
                let locked =
                    active.contains(&plan.id) || (plan.one_time_only && ever.contains(&plan.id));
                PlanView::new(plan).locked(locked)
            })
            .collect())
    }

    pub async fn create(&self, plan: NewPlan) -> Result<Plan, AppError> {
        plan.validate().map_err(AppError::BadRequest)?;
        let created = self.store.insert_plan(plan, self.clock.now()).await?;
        tracing::info!(plan_id = %created.id, title = %created.title, "Plan created");
        Ok(created)
    }

    /// Edits a plan. Existing investments keep their own snapshots.
    pub async fn update(&self, plan_id: Uuid, update: PlanUpdate) -> Result<Plan, AppError> {
        let current = self.get(plan_id).await?;
        let updated = update
            .apply(&current, self.clock.now())
            .map_err(AppError::BadRequest)?;
        let saved = self
            .store
            .save_plan(&updated)
            .await?
            .ok_or(AppError::PlanNotFound)?;
        tracing::info!(plan_id = %saved.id, "Plan updated");
        Ok(saved)
    }

    pub async fn toggle_active(&self, plan_id: Uuid) -> Result<Plan, AppError> {
        let plan = self
            .store
            .toggle_plan_active(plan_id, self.clock.now())
            .await?
            .ok_or(AppError::PlanNotFound)?;
        tracing::info!(plan_id = %plan.id, is_active = plan.is_active, "Plan status toggled");
        Ok(plan)
    }

    /// Removes a plan nobody ever invested in.
    pub async fn delete(&self, plan_id: Uuid) -> Result<(), AppError> {
        if !self.store.delete_plan(plan_id).await? {
            return Err(AppError::PlanNotFound);
        }
        tracing::info!(plan_id = %plan_id, "Plan deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DurationUnit, PlanCategory, PlanDuration};
    use crate::services::testing::{new_plan, Fixture};

    #[tokio::test]
    async fn test_create_rejects_invalid_terms() {
        let fx = Fixture::new();
        let mut plan = new_plan("Broken", 5000, 5000, PlanDuration::new(1, DurationUnit::Months));
        let err = fx.catalog().create(plan.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        plan.total_maturity_amount = 5600;
        plan.duration = PlanDuration::new(0, DurationUnit::Days);
        let err = fx.catalog().create(plan).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(fx.catalog().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_plan() {
        let fx = Fixture::new();
        let err = fx.catalog().get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::PlanNotFound));
    }

    #[tokio::test]
    async fn test_list_active_hides_inactive_plans() {
        let fx = Fixture::new();
        let kept = fx.plan(5000, 5600, false).await;
        let hidden = fx.plan(1000, 1100, false).await;
        fx.catalog().toggle_active(hidden.id).await.unwrap();

        let active = fx.catalog().list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, kept.id);
        assert_eq!(fx.catalog().list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let fx = Fixture::new();
        let plan = fx.plan(5000, 5600, false).await;
        let updated = fx
            .catalog()
            .update(
                plan.id,
                PlanUpdate {
                    title: Some("Gold Plus".to_string()),
                    category: Some(PlanCategory::Diamond),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Gold Plus");
        assert_eq!(updated.category, PlanCategory::Diamond);
        assert_eq!(updated.amount, 5000);

        let err = fx
            .catalog()
            .update(
                plan.id,
                PlanUpdate {
                    total_maturity_amount: Some(4000),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_plan_with_history_is_refused() {
        let fx = Fixture::new();
        let user = fx.user(50_000).await;
        let plan = fx.plan(5000, 5600, false).await;
        fx.engine().buy(user, plan.id).await.unwrap();

        let err = fx.catalog().delete(plan.id).await.unwrap_err();
        assert!(matches!(err, AppError::HasActiveInvestments));

        let unused = fx.plan(1000, 1100, false).await;
        fx.catalog().delete(unused.id).await.unwrap();
        let err = fx.catalog().delete(unused.id).await.unwrap_err();
        assert!(matches!(err, AppError::PlanNotFound));
    }

    #[tokio::test]
    async fn test_lock_status_reflects_user_history() {
        let fx = Fixture::new();
        let user = fx.user(50_000).await;
        let regular = fx.plan(5000, 5600, false).await;
        let one_time = fx.plan(1000, 1100, true).await;
        let untouched = fx.plan(2000, 2400, false).await;

        fx.engine().buy(user, regular.id).await.unwrap();
        fx.engine().buy(user, one_time.id).await.unwrap();

        fn locked_for(views: &[PlanView], id: Uuid) -> bool {
            views
                .iter()
                .find(|v| v.plan.id == id)
                .and_then(|v| v.is_locked)
                .unwrap()
        }

        let views = fx.catalog().plans_with_lock_status(user).await.unwrap();
        assert!(locked_for(&views, regular.id));
        assert!(locked_for(&views, one_time.id));
        assert!(!locked_for(&views, untouched.id));

        // After maturity only the one-time plan stays locked.
        fx.clock.advance(chrono::Duration::days(400));
        fx.scheduler().run_once().await.unwrap();
        let views = fx.catalog().plans_with_lock_status(user).await.unwrap();
        assert!(!locked_for(&views, regular.id));
        assert!(locked_for(&views, one_time.id));

        // Another user sees nothing locked.
        let other = fx.user(0).await;
        let views = fx.catalog().plans_with_lock_status(other).await.unwrap();
        assert!(views.iter().all(|v| v.is_locked == Some(false)));
    }

    #[test]
    fn test_plan_view_serializes_derived_fields() {
        let now = chrono::Utc::now();
        let plan = new_plan("Silver", 5000, 5600, PlanDuration::new(2, DurationUnit::Months));
        let plan = Plan {
            id: Uuid::new_v4(),
            title: plan.title,
            description: plan.description,
            category: plan.category,
            amount: plan.amount,
            total_maturity_amount: plan.total_maturity_amount,
            duration: plan.duration,
            is_active: true,
            one_time_only: false,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(PlanView::new(plan)).unwrap();
        assert_eq!(json["durationInDays"], 60);
        assert_eq!(json["profitAmount"], 600);
        assert_eq!(json["returnPercent"], "12.00");
        assert_eq!(json["totalMaturityAmount"], 5600);
        assert!(json.get("isLocked").is_none());
    }
}
