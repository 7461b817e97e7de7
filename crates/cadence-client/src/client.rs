use crate::error::{ClientError, Result};
use cadence_core::abtest::AbTestDefinition;
use cadence_core::ai::{AiBudget, AiUsage};
use cadence_core::config::Config;
use cadence_core::inbox::{AiDraft, AiDraftRequest, Message, ReplyRequest, Thread};
use cadence_core::integration::{authorize_path, Integration};
use cadence_core::privacy::{PrivacyJob, PrivacyRequest, RetentionPolicy};
use cadence_core::rule::{RuleDefinition, RuleRun, RuleTestRequest, RuleTestResult};
use cadence_core::template::Template;
use cadence_core::types::{Provider, Trigger};
use cadence_core::workflow::WorkflowDefinition;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub const TENANT_HEADER: &str = "X-Tenant-Id";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Typed client for the `/api/v1` surface.
///
/// Every call is a single attempt: non-2xx responses become
/// [`ClientError::Http`], connection failures [`ClientError::Transport`] and
/// unexpected bodies [`ClientError::Decode`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tenant: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::with_timeout(&config.api.base_url, config.timeout());
        client.tenant = config.tenant.clone().filter(|t| !t.trim().is_empty());
        client
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.http.request(method, self.url(path));
        if let Some(tenant) = &self.tenant {
            req = req.header(TENANT_HEADER, tenant);
        }
        req
    }

    async fn execute(&self, path: &str, req: RequestBuilder) -> Result<Vec<u8>> {
        tracing::debug!(path, "api request");
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());
            tracing::debug!(path, status = status.as_u16(), %message, "api error");
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body.to_vec())
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, req: RequestBuilder) -> Result<T> {
        let body = self.execute(path, req).await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call(path, self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.call(path, self.request(Method::POST, path).json(body)).await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.call(path, self.request(Method::PUT, path).json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.execute(path, self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------------

    pub async fn list_rules(&self) -> Result<Vec<RuleDefinition>> {
        self.get("/rules").await
    }

    pub async fn create_rule(&self, rule: &RuleDefinition) -> Result<RuleDefinition> {
        self.post("/rules", rule).await
    }

    pub async fn update_rule(&self, id: &str, rule: &RuleDefinition) -> Result<RuleDefinition> {
        self.put(&format!("/rules/{id}"), rule).await
    }

    pub async fn delete_rule(&self, id: &str) -> Result<()> {
        self.delete(&format!("/rules/{id}")).await
    }

    pub async fn toggle_rule(&self, id: &str, enabled: bool) -> Result<RuleDefinition> {
        self.post(&format!("/rules/{id}/toggle"), &json!({ "enabled": enabled }))
            .await
    }

    pub async fn test_rule(&self, request: &RuleTestRequest) -> Result<RuleTestResult> {
        self.post("/rules/test", request).await
    }

    pub async fn recent_runs(&self, limit: Option<usize>) -> Result<Vec<RuleRun>> {
        match limit {
            Some(n) => self.get(&format!("/rules/runs/recent?limit={n}")).await,
            None => self.get("/rules/runs/recent").await,
        }
    }

    pub async fn retry_run(&self, id: &str) -> Result<RuleRun> {
        self.post(&format!("/rules/runs/{id}/retry"), &json!({})).await
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>> {
        self.get("/workflows").await
    }

    pub async fn create_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition> {
        self.post("/workflows", workflow).await
    }

    pub async fn toggle_workflow(&self, id: &str, enabled: bool) -> Result<WorkflowDefinition> {
        self.post(&format!("/workflows/{id}/toggle"), &json!({ "enabled": enabled }))
            .await
    }

    pub async fn start_workflow(&self, id: &str) -> Result<WorkflowDefinition> {
        self.post(&format!("/workflows/{id}/start"), &json!({})).await
    }

    pub async fn stop_workflow(&self, id: &str) -> Result<WorkflowDefinition> {
        self.post(&format!("/workflows/{id}/stop"), &json!({})).await
    }

    pub async fn delete_workflow(&self, id: &str) -> Result<()> {
        self.delete(&format!("/workflows/{id}")).await
    }

    // -----------------------------------------------------------------------
    // A/B tests
    // -----------------------------------------------------------------------

    pub async fn list_ab_tests(&self) -> Result<Vec<AbTestDefinition>> {
        self.get("/ab-tests").await
    }

    pub async fn create_ab_test(&self, test: &AbTestDefinition) -> Result<AbTestDefinition> {
        self.post("/ab-tests", test).await
    }

    pub async fn start_ab_test(&self, id: &str) -> Result<AbTestDefinition> {
        self.post(&format!("/ab-tests/{id}/start"), &json!({})).await
    }

    pub async fn stop_ab_test(&self, id: &str) -> Result<AbTestDefinition> {
        self.post(&format!("/ab-tests/{id}/stop"), &json!({})).await
    }

    pub async fn delete_ab_test(&self, id: &str) -> Result<()> {
        self.delete(&format!("/ab-tests/{id}")).await
    }

    // -----------------------------------------------------------------------
    // Inbox
    // -----------------------------------------------------------------------

    pub async fn threads(&self) -> Result<Vec<Thread>> {
        self.get("/inbox/threads").await
    }

    pub async fn messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let path = "/inbox/messages";
        let req = self
            .request(Method::GET, path)
            .query(&[("thread_id", thread_id)]);
        self.call(path, req).await
    }

    pub async fn reply(&self, request: &ReplyRequest) -> Result<Message> {
        self.post("/inbox/reply", request).await
    }

    pub async fn ai_draft(&self, request: &AiDraftRequest) -> Result<AiDraft> {
        self.post("/inbox/ai-draft", request).await
    }

    // -----------------------------------------------------------------------
    // AI usage
    // -----------------------------------------------------------------------

    pub async fn ai_usage(&self) -> Result<AiUsage> {
        self.get("/ai/usage").await
    }

    pub async fn ai_budget(&self) -> Result<AiBudget> {
        self.get("/ai/budget").await
    }

    pub async fn set_ai_budget(&self, budget: &AiBudget) -> Result<AiBudget> {
        self.post("/ai/budget", budget).await
    }

    pub async fn reset_daily_usage(&self) -> Result<AiUsage> {
        self.post("/ai/reset-daily", &json!({})).await
    }

    // -----------------------------------------------------------------------
    // Privacy
    // -----------------------------------------------------------------------

    pub async fn retention(&self) -> Result<RetentionPolicy> {
        self.get("/privacy/retention").await
    }

    pub async fn set_retention(&self, policy: &RetentionPolicy) -> Result<RetentionPolicy> {
        self.put("/privacy/retention", policy).await
    }

    pub async fn request_export(&self, request: &PrivacyRequest) -> Result<PrivacyJob> {
        self.post("/privacy/export", request).await
    }

    pub async fn request_delete(&self, request: &PrivacyRequest) -> Result<PrivacyJob> {
        self.post("/privacy/delete", request).await
    }

    pub async fn privacy_jobs(&self) -> Result<Vec<PrivacyJob>> {
        self.get("/privacy/jobs").await
    }

    // -----------------------------------------------------------------------
    // Templates / integrations
    // -----------------------------------------------------------------------

    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        self.get("/templates").await
    }

    pub async fn create_template(&self, template: &Template) -> Result<Template> {
        self.post("/templates", template).await
    }

    pub async fn list_integrations(&self) -> Result<Vec<Integration>> {
        self.get("/integrations").await
    }

    /// Absolute URL of the provider's OAuth redirect. Opened in a browser,
    /// never fetched.
    pub fn authorize_url(&self, provider: Provider) -> String {
        self.url(&authorize_path(provider))
    }

    // -----------------------------------------------------------------------
    // Mock backend only
    // -----------------------------------------------------------------------

    /// Fire a trigger event at the mock backend; returns the runs it started.
    pub async fn fire_event(&self, trigger: Trigger, payload: &Value) -> Result<Vec<RuleRun>> {
        self.post(&format!("/events/{trigger}"), payload).await
    }
}
