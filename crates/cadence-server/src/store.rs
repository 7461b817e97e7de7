//! In-memory backing store for the mock backend.

use cadence_core::abtest::AbTestDefinition;
use cadence_core::ai::{AiBudget, AiUsage};
use cadence_core::dashboard::Listing;
use cadence_core::inbox::{sort_threads, AiDraft, AiDraftRequest, Message, ReplyRequest, Thread};
use cadence_core::integration::{merge_with_providers, Integration};
use cadence_core::privacy::{PrivacyJob, PrivacyRequest, RetentionPolicy};
use cadence_core::rule::{RuleDefinition, RuleRun};
use cadence_core::template::Template;
use cadence_core::types::{
    ControlCommand, JobStatus, MessageDirection, PrivacyJobKind, RunStatus, Trigger, WorkflowStatus,
};
use cadence_core::validation::ValidationErrors;
use cadence_core::workflow::WorkflowDefinition;
use cadence_core::{CadenceError, Result};
use chrono::Utc;
use serde_json::{json, Value};

/// Payload key that makes every run started by the event fail.
pub const SIMULATE_FAILURE_KEY: &str = "simulate_failure";

/// Runs kept in history; older ones are dropped first.
pub const MAX_RUNS: usize = 500;

const DRAFT_TOKENS: u64 = 180;
const DRAFT_COST: f64 = 0.002;

pub fn new_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}

#[derive(Debug, Default)]
pub struct Store {
    pub rules: Vec<RuleDefinition>,
    pub workflows: Vec<WorkflowDefinition>,
    pub ab_tests: Vec<AbTestDefinition>,
    /// Oldest first.
    pub runs: Vec<RuleRun>,
    pub threads: Vec<Thread>,
    pub messages: Vec<Message>,
    pub ai_usage: AiUsage,
    pub ai_budget: AiBudget,
    pub retention: RetentionPolicy,
    pub privacy_jobs: Vec<PrivacyJob>,
    pub templates: Vec<Template>,
    pub integrations: Vec<Integration>,
}

fn find_mut<'a, T: Listing>(
    items: &'a mut [T],
    id: &str,
    missing: fn(String) -> CadenceError,
) -> Result<&'a mut T> {
    items
        .iter_mut()
        .find(|i| i.id() == id)
        .ok_or_else(|| missing(id.to_string()))
}

fn remove<T: Listing>(items: &mut Vec<T>, id: &str, missing: fn(String) -> CadenceError) -> Result<()> {
    let idx = items
        .iter()
        .position(|i| i.id() == id)
        .ok_or_else(|| missing(id.to_string()))?;
    items.remove(idx);
    Ok(())
}

impl Store {
    // -----------------------------------------------------------------------
    // Rules
    // -----------------------------------------------------------------------

    pub fn create_rule(&mut self, mut rule: RuleDefinition) -> Result<RuleDefinition> {
        rule.validate().into_result()?;
        let now = Utc::now();
        rule.id = Some(new_id("rule"));
        rule.created_at = Some(now);
        rule.updated_at = Some(now);
        self.rules.push(rule.clone());
        Ok(rule)
    }

    pub fn update_rule(&mut self, id: &str, mut rule: RuleDefinition) -> Result<RuleDefinition> {
        rule.validate().into_result()?;
        let existing = find_mut(&mut self.rules, id, CadenceError::RuleNotFound)?;
        rule.id = existing.id.clone();
        rule.created_at = existing.created_at;
        rule.updated_at = Some(Utc::now());
        *existing = rule.clone();
        Ok(rule)
    }

    pub fn delete_rule(&mut self, id: &str) -> Result<()> {
        remove(&mut self.rules, id, CadenceError::RuleNotFound)
    }

    pub fn toggle_rule(&mut self, id: &str, enabled: bool) -> Result<RuleDefinition> {
        let rule = find_mut(&mut self.rules, id, CadenceError::RuleNotFound)?;
        rule.enabled = enabled;
        rule.updated_at = Some(Utc::now());
        Ok(rule.clone())
    }

    /// Newest first.
    pub fn recent_runs(&self, limit: usize) -> Vec<RuleRun> {
        self.runs.iter().rev().take(limit).cloned().collect()
    }

    pub fn retry_run(&mut self, id: &str) -> Result<RuleRun> {
        let run = find_mut(&mut self.runs, id, CadenceError::RunNotFound)?;
        run.apply(ControlCommand::Retry)?;
        run.started_at = Utc::now();
        Ok(run.clone())
    }

    /// Move a pending or running run to a terminal status.
    pub fn finish_run(&mut self, id: &str, status: RunStatus) -> Result<RuleRun> {
        let run = find_mut(&mut self.runs, id, CadenceError::RunNotFound)?;
        if !run.status.is_terminal() {
            run.status = status;
            run.completed_at = Some(Utc::now());
        }
        Ok(run.clone())
    }

    /// Evaluate every enabled rule listening on `trigger` and record a run
    /// for each one whose condition holds.
    pub fn fire(&mut self, trigger: Trigger, payload: &Value) -> Vec<RuleRun> {
        let fail = payload
            .get(SIMULATE_FAILURE_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let now = Utc::now();
        let mut started = Vec::new();
        for rule in self.rules.iter().filter(|r| r.enabled && r.trigger == trigger) {
            let outcome = rule.test(payload);
            if !outcome.condition_met {
                continue;
            }
            let run = RuleRun {
                id: new_id("run"),
                rule_id: rule.id_or_empty().to_string(),
                status: if fail { RunStatus::Failed } else { RunStatus::Success },
                started_at: now,
                completed_at: Some(now),
                meta: json!({
                    "trigger": trigger,
                    "actions": outcome.actions,
                    "payload": payload,
                }),
            };
            started.push(run);
        }
        tracing::debug!(%trigger, runs = started.len(), "event fired");
        self.runs.extend(started.iter().cloned());
        if self.runs.len() > MAX_RUNS {
            let excess = self.runs.len() - MAX_RUNS;
            self.runs.drain(..excess);
        }
        started
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    pub fn create_workflow(&mut self, mut workflow: WorkflowDefinition) -> Result<WorkflowDefinition> {
        workflow.validate().into_result()?;
        workflow.id = Some(new_id("wf"));
        workflow.status = WorkflowStatus::Draft;
        self.workflows.push(workflow.clone());
        Ok(workflow)
    }

    pub fn toggle_workflow(&mut self, id: &str, enabled: bool) -> Result<WorkflowDefinition> {
        let wf = find_mut(&mut self.workflows, id, CadenceError::WorkflowNotFound)?;
        wf.enabled = enabled;
        Ok(wf.clone())
    }

    pub fn control_workflow(&mut self, id: &str, command: ControlCommand) -> Result<WorkflowDefinition> {
        let wf = find_mut(&mut self.workflows, id, CadenceError::WorkflowNotFound)?;
        wf.apply(command)?;
        Ok(wf.clone())
    }

    pub fn delete_workflow(&mut self, id: &str) -> Result<()> {
        remove(&mut self.workflows, id, CadenceError::WorkflowNotFound)
    }

    // -----------------------------------------------------------------------
    // A/B tests
    // -----------------------------------------------------------------------

    pub fn create_ab_test(&mut self, mut test: AbTestDefinition) -> Result<AbTestDefinition> {
        test.validate().into_result()?;
        test.id = Some(new_id("abt"));
        for v in &mut test.variants {
            if v.id.is_none() {
                v.id = Some(new_id("var"));
            }
        }
        self.ab_tests.push(test.clone());
        Ok(test)
    }

    pub fn control_ab_test(&mut self, id: &str, command: ControlCommand) -> Result<AbTestDefinition> {
        let test = find_mut(&mut self.ab_tests, id, CadenceError::AbTestNotFound)?;
        test.apply(command)?;
        Ok(test.clone())
    }

    pub fn delete_ab_test(&mut self, id: &str) -> Result<()> {
        remove(&mut self.ab_tests, id, CadenceError::AbTestNotFound)
    }

    // -----------------------------------------------------------------------
    // Inbox
    // -----------------------------------------------------------------------

    pub fn threads(&self) -> Vec<Thread> {
        let mut threads = self.threads.clone();
        sort_threads(&mut threads);
        threads
    }

    fn thread_mut(&mut self, id: &str) -> Result<&mut Thread> {
        self.threads
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CadenceError::ThreadNotFound(id.to_string()))
    }

    pub fn messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        if !self.threads.iter().any(|t| t.id == thread_id) {
            return Err(CadenceError::ThreadNotFound(thread_id.to_string()));
        }
        Ok(self
            .messages
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect())
    }

    pub fn reply(&mut self, request: ReplyRequest) -> Result<Message> {
        request.validate().into_result()?;
        let now = Utc::now();
        let thread = self.thread_mut(&request.thread_id)?;
        thread.last_message = request.body.clone();
        thread.last_message_at = now;
        let message = Message {
            id: new_id("msg"),
            thread_id: request.thread_id,
            direction: MessageDirection::Outbound,
            author: "you".to_string(),
            body: request.body,
            sent_at: now,
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Canned suggestion addressed to the thread's participant.
    pub fn ai_draft(&mut self, request: AiDraftRequest) -> Result<AiDraft> {
        let participant = self.thread_mut(&request.thread_id)?.participant.clone();
        let body = match request.tone.as_deref() {
            Some("formal") => format!("Dear {participant}, thank you for your message. We will follow up shortly."),
            _ => format!("Hi {participant}! Thanks for reaching out, we'll get back to you soon."),
        };
        self.ai_usage.record(DRAFT_TOKENS, DRAFT_COST);
        Ok(AiDraft {
            thread_id: request.thread_id,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // AI budget / privacy / templates
    // -----------------------------------------------------------------------

    pub fn set_budget(&mut self, budget: AiBudget) -> Result<AiBudget> {
        budget.validate().into_result()?;
        self.ai_budget = budget.clone();
        Ok(budget)
    }

    pub fn reset_daily(&mut self) -> AiUsage {
        self.ai_usage.reset_daily(Utc::now());
        self.ai_usage.clone()
    }

    pub fn set_retention(&mut self, policy: RetentionPolicy) -> Result<RetentionPolicy> {
        policy.validate().into_result()?;
        self.retention = policy.clone();
        Ok(policy)
    }

    pub fn start_privacy_job(&mut self, kind: PrivacyJobKind, request: PrivacyRequest) -> Result<PrivacyJob> {
        request.validate(kind).into_result()?;
        let id = new_id("job");
        let now = Utc::now();
        let job = PrivacyJob {
            download_url: (kind == PrivacyJobKind::Export).then(|| format!("/privacy/exports/{id}.zip")),
            id,
            kind,
            status: JobStatus::Completed,
            subject: request.subject,
            created_at: now,
            completed_at: Some(now),
        };
        self.privacy_jobs.push(job.clone());
        Ok(job)
    }

    pub fn create_template(&mut self, mut template: Template) -> Result<Template> {
        let mut errors = ValidationErrors::new();
        errors.require("name", &template.name, "Name is required");
        errors.require("body", &template.body, "Body is required");
        errors.into_result()?;
        template.id = Some(new_id("tpl"));
        self.templates.push(template.clone());
        Ok(template)
    }

    pub fn integrations(&self) -> Vec<Integration> {
        merge_with_providers(&self.integrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::action::{PauseUnderperformerParams, RuleAction};
    use cadence_core::condition::Condition;
    use cadence_core::types::Operator;

    fn store_with_rule() -> (Store, String) {
        let mut store = Store::default();
        let rule = store
            .create_rule(RuleDefinition::new(
                "Pause weak posts",
                "Pause posts below 2% engagement",
                Trigger::PostPerformance,
                Condition::leaf("engagement_rate", Operator::Lt, 0.02),
                vec![RuleAction::PauseUnderperformer(PauseUnderperformerParams::default())],
            ))
            .unwrap();
        let id = rule.id.unwrap();
        (store, id)
    }

    #[test]
    fn create_assigns_id_and_timestamps() {
        let (store, id) = store_with_rule();
        assert!(id.starts_with("rule-"));
        assert!(store.rules[0].created_at.is_some());
    }

    #[test]
    fn run_history_keeps_newest() {
        let (mut store, _) = store_with_rule();
        let payload = json!({"engagement_rate": 0.01});
        let first = store.fire(Trigger::PostPerformance, &payload);
        for _ in 0..MAX_RUNS {
            store.fire(Trigger::PostPerformance, &payload);
        }
        let last = store.fire(Trigger::PostPerformance, &payload);
        assert_eq!(store.runs.len(), MAX_RUNS);
        assert!(store.runs.iter().all(|r| r.id != first[0].id));
        assert_eq!(store.runs.last().map(|r| r.id.as_str()), Some(last[0].id.as_str()));
    }

    #[test]
    fn fire_records_runs_only_when_condition_holds() {
        let (mut store, id) = store_with_rule();
        assert!(store
            .fire(Trigger::PostPerformance, &json!({"engagement_rate": 0.05}))
            .is_empty());
        assert!(store
            .fire(Trigger::InboxMessageReceived, &json!({"engagement_rate": 0.01}))
            .is_empty());

        let runs = store.fire(Trigger::PostPerformance, &json!({"engagement_rate": 0.01}));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].rule_id, id);
        assert_eq!(runs[0].status, RunStatus::Success);
        assert_eq!(runs[0].meta["actions"][0], "pause_underperformer");
    }

    #[test]
    fn disabled_rules_do_not_fire() {
        let (mut store, id) = store_with_rule();
        store.toggle_rule(&id, false).unwrap();
        assert!(store
            .fire(Trigger::PostPerformance, &json!({"engagement_rate": 0.01}))
            .is_empty());
    }

    #[test]
    fn failed_run_can_be_retried_once() {
        let (mut store, _) = store_with_rule();
        let runs = store.fire(
            Trigger::PostPerformance,
            &json!({"engagement_rate": 0.01, "simulate_failure": true}),
        );
        let run_id = runs[0].id.clone();
        assert_eq!(store.retry_run(&run_id).unwrap().status, RunStatus::Pending);
        assert!(matches!(
            store.retry_run(&run_id).unwrap_err(),
            CadenceError::InvalidTransition { .. }
        ));
        assert_eq!(store.finish_run(&run_id, RunStatus::Success).unwrap().status, RunStatus::Success);
    }

    #[test]
    fn update_keeps_identity() {
        let (mut store, id) = store_with_rule();
        let mut edited = store.rules[0].clone();
        edited.id = None;
        edited.name = "Renamed".into();
        let updated = store.update_rule(&id, edited).unwrap();
        assert_eq!(updated.id.as_deref(), Some(id.as_str()));
        assert_eq!(store.rules[0].name, "Renamed");
        assert!(matches!(
            store.delete_rule("nope").unwrap_err(),
            CadenceError::RuleNotFound(_)
        ));
    }

    #[test]
    fn delete_job_requires_confirmation() {
        let mut store = Store::default();
        let req = PrivacyRequest {
            subject: "ana@example.com".into(),
            confirm: false,
        };
        assert!(store.start_privacy_job(PrivacyJobKind::Delete, req.clone()).is_err());
        let job = store.start_privacy_job(PrivacyJobKind::Export, req).unwrap();
        assert!(job.download_url.is_some());
    }
}
