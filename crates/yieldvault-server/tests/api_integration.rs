//! Integration tests for the investment lifecycle over HTTP.
//!
//! These run the full router against the in-memory store with a manual
//! clock, so maturity can be reached without waiting.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;
use uuid::Uuid;

use yieldvault_server::clock::ManualClock;
use yieldvault_server::config::SweepConfig;
use yieldvault_server::store::MemoryLedgerStore;
use yieldvault_server::{create_router, AppState};

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let state = AppState::new(
            Arc::new(MemoryLedgerStore::new()),
            clock.clone(),
            SweepConfig::default(),
        )
        .expect("Failed to build state");
        Self {
            router: create_router(state),
            clock,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header("Content-Type", "application/json");
                Body::from(serde_json::to_string(&body).unwrap())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Failed to parse JSON response")
        };
        (status, json)
    }

    async fn open_wallet(&self, balance: i64) -> Uuid {
        let user_id = Uuid::new_v4();
        let (status, _) = self
            .send(
                "POST",
                "/api/v1/admin/wallets",
                Some(json!({ "userId": user_id, "balance": balance })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        user_id
    }

    async fn create_plan(&self, amount: i64, total: i64, months: i32, one_time_only: bool) -> Uuid {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/admin/plans",
                Some(json!({
                    "title": "Gold Growth",
                    "description": "Fixed return",
                    "category": "gold",
                    "amount": amount,
                    "totalMaturityAmount": total,
                    "duration": { "value": months, "unit": "months" },
                    "oneTimeOnly": one_time_only
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        Uuid::parse_str(body["id"].as_str().expect("Plan id missing")).unwrap()
    }

    async fn buy(&self, user_id: Uuid, plan_id: Uuid) -> (StatusCode, Value) {
        self.send(
            "POST",
            &format!("/api/v1/plans/buy/{}", plan_id),
            Some(json!({ "userId": user_id })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

/// Tests the complete lifecycle:
/// 1. Open wallet and create plan
/// 2. Buy the plan
/// 3. Second purchase is refused while active
/// 4. Sweep after maturity pays out
/// 5. Dashboard reflects the whole history
#[tokio::test]
async fn test_purchase_and_maturity_lifecycle() {
    let app = TestApp::new();
    let user_id = app.open_wallet(50_000).await;
    let plan_id = app.create_plan(5000, 5600, 1, false).await;

    // Step 1: Plan listed and unlocked
    let (status, body) = app
        .send("GET", &format!("/api/v1/plans?userId={}", user_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"].as_array().unwrap().len(), 4);
    assert_eq!(body["plans"][0]["isLocked"], false);
    assert_eq!(body["plans"][0]["returnPercent"], "12.00");

    // Step 2: Buy
    let (status, body) = app.buy(user_id, plan_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newWalletBalance"], 45_000);
    assert_eq!(body["investment"]["status"], "active");
    assert_eq!(body["investment"]["plan"]["id"], plan_id.to_string());
    assert_eq!(body["investment"]["maturityDate"], "2026-04-01T09:00:00Z");

    // Step 3: Duplicate refused, plan now locked
    let (status, body) = app.buy(user_id, plan_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("already have an active investment"));

    let (_, body) = app
        .send("GET", &format!("/api/v1/plans?userId={}", user_id), None)
        .await;
    assert_eq!(body["plans"][0]["isLocked"], true);

    // Step 4: Nothing to pay before maturity, then exactly once after
    let (_, report) = app.send("POST", "/api/v1/admin/maturity/run", None).await;
    assert_eq!(report["found"], 0);

    app.clock.advance(Duration::days(31));
    let (status, report) = app.send("POST", "/api/v1/admin/maturity/run", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["completed"], 1);
    assert_eq!(report["credited"], 5600);

    let (_, report) = app.send("POST", "/api/v1/admin/maturity/run", None).await;
    assert_eq!(report["found"], 0);

    // Step 5: Dashboard
    let (status, dashboard) = app
        .send("GET", &format!("/api/v1/user/dashboard?userId={}", user_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["walletBalance"], 50_600);
    assert_eq!(dashboard["totalInvested"], 5000);
    assert_eq!(dashboard["activeInvestments"], 0);
    assert_eq!(dashboard["investments"][0]["status"], "completed");
    assert_eq!(dashboard["investments"][0]["progressPercent"], 100.0);

    let history = dashboard["recentTransactions"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["type"], "return");
    assert_eq!(history[0]["amount"], 5600);
    assert_eq!(history[1]["type"], "purchase");

    let (_, active) = app
        .send("GET", &format!("/api/v1/plans/my-investments?userId={}", user_id), None)
        .await;
    assert!(active.as_array().unwrap().is_empty());

    let (_, all) = app
        .send("GET", &format!("/api/v1/user/investments?userId={}", user_id), None)
        .await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_insufficient_funds_response() {
    let app = TestApp::new();
    let user_id = app.open_wallet(1000).await;
    let plan_id = app.create_plan(5000, 5600, 1, false).await;

    let (status, body) = app.buy(user_id, plan_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["required"], 5000);
    assert_eq!(body["available"], 1000);

    let (_, wallet) = app
        .send("GET", &format!("/api/v1/wallet?userId={}", user_id), None)
        .await;
    assert_eq!(wallet["balance"], 1000);
}

#[tokio::test]
async fn test_unknown_and_inactive_plans() {
    let app = TestApp::new();
    let user_id = app.open_wallet(10_000).await;

    let (status, body) = app.buy(user_id, Uuid::new_v4()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Investment plan not found");

    let plan_id = app.create_plan(5000, 5600, 1, false).await;
    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/v1/admin/plans/{}/toggle-status", plan_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], false);

    let (status, _) = app.buy(user_id, plan_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.send("GET", "/api/v1/plans", None).await;
    assert!(body["plans"].as_array().unwrap().is_empty());
    let (_, body) = app.send("GET", "/api/v1/admin/plans", None).await;
    assert_eq!(body["plans"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_one_time_plan_over_http() {
    let app = TestApp::new();
    let user_id = app.open_wallet(10_000).await;
    let plan_id = app.create_plan(1000, 1100, 1, true).await;

    let (status, _) = app.buy(user_id, plan_id).await;
    assert_eq!(status, StatusCode::OK);
    app.clock.advance(Duration::days(40));
    app.send("POST", "/api/v1/admin/maturity/run", None).await;

    let (status, body) = app.buy(user_id, plan_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("one-time"));
}

#[tokio::test]
async fn test_deposit_review_flow() {
    let app = TestApp::new();
    let user_id = app.open_wallet(0).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/wallet/deposits",
            Some(json!({ "userId": user_id, "amount": 7500, "proof": "upload-42.jpg" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["transaction"]["status"], "pending");
    let transaction_id = body["transaction"]["id"].as_str().unwrap().to_string();

    let (_, pending) = app
        .send("GET", "/api/v1/admin/transactions/pending", None)
        .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/v1/admin/transactions/{}/status", transaction_id),
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["walletBalance"], 7500);

    // Reviewing twice is refused.
    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/v1/admin/transactions/{}/status", transaction_id),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/wallet/withdrawals",
            Some(json!({ "userId": user_id, "amount": 9000 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["available"], 7500);

    let (_, history) = app
        .send(
            "GET",
            &format!("/api/v1/wallet/history?userId={}&limit=5", user_id),
            None,
        )
        .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_dashboard_totals() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/api/v1/admin/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 0);
    assert_eq!(body["totalInvestedAmount"], 0);

    let investor = app.open_wallet(20_000).await;
    let saver = app.open_wallet(0).await;
    let plan_id = app.create_plan(5000, 5600, 1, false).await;
    let (status, _) = app.buy(investor, plan_id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/wallet/deposits",
            Some(json!({ "userId": saver, "amount": 1500 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .send(
            "POST",
            "/api/v1/wallet/withdrawals",
            Some(json!({ "userId": investor, "amount": 1000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.send("GET", "/api/v1/admin/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "totalUsers": 2,
            "totalInvestments": 1,
            "activeInvestments": 1,
            "pendingDeposits": 1,
            "pendingWithdrawals": 1,
            "totalInvestedAmount": 5000
        })
    );
}

#[tokio::test]
async fn test_plan_with_investments_cannot_be_deleted() {
    let app = TestApp::new();
    let user_id = app.open_wallet(10_000).await;
    let plan_id = app.create_plan(5000, 5600, 1, false).await;
    app.buy(user_id, plan_id).await;

    let (status, body) = app
        .send("DELETE", &format!("/api/v1/admin/plans/{}", plan_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Deactivate"));

    // Editing the plan does not touch the existing investment.
    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/v1/admin/plans/{}", plan_id),
            Some(json!({ "amount": 6000, "totalMaturityAmount": 7000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, investments) = app
        .send("GET", &format!("/api/v1/user/investments?userId={}", user_id), None)
        .await;
    assert_eq!(investments[0]["investedAmount"], 5000);
    assert_eq!(investments[0]["totalMaturityAmount"], 5600);
}

#[tokio::test]
async fn test_invalid_plan_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/admin/plans",
            Some(json!({
                "title": "Bad",
                "description": "",
                "category": "silver",
                "amount": 5000,
                "totalMaturityAmount": 4000,
                "duration": { "value": 1, "unit": "months" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn test_scheduler_lifecycle_from_state() {
    let state = AppState::new(
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(ManualClock::new(Utc::now())),
        SweepConfig::default(),
    )
    .expect("Failed to build state");

    assert!(state.scheduler.start());
    assert!(state.scheduler.is_running());
    let report = assert_ok!(state.scheduler.run_once().await);
    assert_eq!(report.found, 0);
    assert!(state.scheduler.stop().await);
}
