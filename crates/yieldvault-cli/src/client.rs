// HTTP client for the YieldVault REST API

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Plan as listed by the catalog endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub amount: i64,
    pub total_maturity_amount: i64,
    pub profit_amount: i64,
    pub return_percent: String,
    pub duration_in_days: i64,
    pub one_time_only: bool,
    #[serde(default)]
    pub is_locked: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PlansPage {
    plans: Vec<PlanSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanTitle {
    pub title: String,
}

/// Investment together with its timeline figures.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentSummary {
    pub id: Uuid,
    pub invested_amount: i64,
    pub total_maturity_amount: i64,
    pub maturity_date: String,
    pub status: String,
    pub days_remaining: i64,
    pub progress_percent: f64,
    pub plan: Option<PlanTitle>,
}

impl InvestmentSummary {
    pub fn plan_title(&self) -> &str {
        self.plan.as_ref().map(|p| p.title.as_str()).unwrap_or("(deleted plan)")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: i64,
    pub status: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyReceipt {
    pub investment: InvestmentSummary,
    pub new_wallet_balance: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub wallet_balance: i64,
    pub total_invested: i64,
    pub active_investments: usize,
    pub investments: Vec<InvestmentSummary>,
    pub recent_transactions: Vec<TransactionSummary>,
}

#[derive(Debug, Deserialize)]
pub struct RequestReceipt {
    pub message: String,
    pub transaction: TransactionSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    pub transaction: TransactionSummary,
    pub wallet_balance: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub as_of: String,
    pub found: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub credited: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSummary {
    pub total_users: i64,
    pub total_investments: i64,
    pub active_investments: i64,
    pub pending_deposits: i64,
    pub pending_withdrawals: i64,
    pub total_invested_amount: i64,
}

/// Blocking client bound to one server.
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
}

impl ApiClient {
    pub fn new(server: &str) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            base_url: api_base(server),
        }
    }

    pub fn plans(&self, user_id: Option<Uuid>) -> Result<Vec<PlanSummary>> {
        let mut request = self.agent.get(&self.url("/plans"));
        if let Some(user_id) = user_id {
            request = request.query("userId", &user_id.to_string());
        }
        let page: PlansPage = read(request.call(), "/plans")?;
        Ok(page.plans)
    }

    pub fn buy(&self, user_id: Uuid, plan_id: Uuid) -> Result<BuyReceipt> {
        let path = format!("/plans/buy/{}", plan_id);
        let response = self
            .agent
            .post(&self.url(&path))
            .send_json(json!({ "userId": user_id }));
        read(response, &path)
    }

    pub fn investments(&self, user_id: Uuid, active_only: bool) -> Result<Vec<InvestmentSummary>> {
        let path = if active_only {
            "/plans/my-investments"
        } else {
            "/user/investments"
        };
        let response = self
            .agent
            .get(&self.url(path))
            .query("userId", &user_id.to_string())
            .call();
        read(response, path)
    }

    pub fn dashboard(&self, user_id: Uuid) -> Result<DashboardSummary> {
        let response = self
            .agent
            .get(&self.url("/user/dashboard"))
            .query("userId", &user_id.to_string())
            .call();
        read(response, "/user/dashboard")
    }

    pub fn history(&self, user_id: Uuid, limit: Option<u32>) -> Result<Vec<TransactionSummary>> {
        let mut request = self
            .agent
            .get(&self.url("/wallet/history"))
            .query("userId", &user_id.to_string());
        if let Some(limit) = limit {
            request = request.query("limit", &limit.to_string());
        }
        read(request.call(), "/wallet/history")
    }

    pub fn deposit(
        &self,
        user_id: Uuid,
        amount: i64,
        proof: Option<&str>,
    ) -> Result<RequestReceipt> {
        let response = self.agent.post(&self.url("/wallet/deposits")).send_json(json!({
            "userId": user_id,
            "amount": amount,
            "proof": proof,
        }));
        read(response, "/wallet/deposits")
    }

    pub fn withdraw(&self, user_id: Uuid, amount: i64) -> Result<RequestReceipt> {
        let response = self
            .agent
            .post(&self.url("/wallet/withdrawals"))
            .send_json(json!({ "userId": user_id, "amount": amount }));
        read(response, "/wallet/withdrawals")
    }

    pub fn pending(&self) -> Result<Vec<TransactionSummary>> {
        let response = self.agent.get(&self.url("/admin/transactions/pending")).call();
        read(response, "/admin/transactions/pending")
    }

    pub fn review(&self, transaction_id: Uuid, approve: bool) -> Result<ReviewReceipt> {
        let path = format!("/admin/transactions/{}/status", transaction_id);
        let status = if approve { "approved" } else { "rejected" };
        let response = self
            .agent
            .put(&self.url(&path))
            .send_json(json!({ "status": status }));
        read(response, &path)
    }

    pub fn stats(&self) -> Result<PlatformSummary> {
        let response = self.agent.get(&self.url("/admin/dashboard")).call();
        read(response, "/admin/dashboard")
    }

    pub fn sweep(&self) -> Result<SweepSummary> {
        let response = self.agent.post(&self.url("/admin/maturity/run")).call();
        read(response, "/admin/maturity/run")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Normalizes a server address to its `/api/v1` prefix.
fn api_base(server: &str) -> String {
    let trimmed = server.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/api/v1").unwrap_or(trimmed);
    format!("{}/api/v1", trimmed)
}

fn read<T: DeserializeOwned>(
    response: std::result::Result<ureq::Response, ureq::Error>,
    path: &str,
) -> Result<T> {
    match response {
        Ok(response) => response
            .into_json()
            .map_err(|e| anyhow!("Malformed response from {}: {}", path, e)),
        Err(ureq::Error::Status(code, response)) => {
            let body: Value = response.into_json().unwrap_or(Value::Null);
            Err(anyhow!(error_message(code, &body)))
        }
        Err(ureq::Error::Transport(e)) => Err(anyhow!("Could not reach server: {}", e)),
    }
}

/// Builds a readable message from an error response body.
fn error_message(code: u16, body: &Value) -> String {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Request failed");

    match (
        body.get("required").and_then(Value::as_i64),
        body.get("available").and_then(Value::as_i64),
    ) {
        (Some(required), Some(available)) => format!(
            "{} (HTTP {}): required ₹{}, available ₹{}",
            message, code, required, available
        ),
        _ => format!("{} (HTTP {})", message, code),
    }
}
