use crate::action::RuleAction;
use crate::condition::{Condition, EvaluationReport};
use crate::types::{ActionType, RunStatus, Trigger};
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// RuleDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Assigned by the backend on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub trigger: Trigger,
    pub condition: Condition,
    /// Accepts a single `action` object or an `actions` array on input.
    #[serde(alias = "action", deserialize_with = "one_or_many")]
    pub actions: Vec<RuleAction>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<RuleAction>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<RuleAction>),
        One(RuleAction),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(v) => v,
        OneOrMany::One(a) => vec![a],
    })
}

impl RuleDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        trigger: Trigger,
        condition: Condition,
        actions: Vec<RuleAction>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            trigger,
            condition,
            actions,
            enabled: true,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Whole-definition checks, used for definitions loaded from files or
    /// posted to the backend rather than built through the wizard.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name, "Name is required");
        errors.require("description", &self.description, "Description is required");
        errors.merge_prefixed("condition", self.condition.validate());
        if self.actions.is_empty() {
            errors.add("actions", "At least one action is required");
        }
        for (i, action) in self.actions.iter().enumerate() {
            errors.merge_prefixed(&format!("actions[{i}]"), action.validate());
        }
        errors
    }

    /// Dry-run the rule against `payload` without executing anything.
    pub fn test(&self, payload: &Value) -> RuleTestResult {
        let report = self.condition.explain(payload);
        let actions = if report.condition_met {
            self.actions.iter().map(RuleAction::action_type).collect()
        } else {
            Vec::new()
        };
        RuleTestResult {
            condition_met: report.condition_met,
            actions,
            report,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule testing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTestRequest {
    pub rule: RuleDefinition,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTestResult {
    pub condition_met: bool,
    /// Action types that would fire; empty when the condition is not met.
    pub actions: Vec<ActionType>,
    pub report: EvaluationReport,
}

// ---------------------------------------------------------------------------
// RuleRun
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRun {
    pub id: String,
    pub rule_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta: Value,
}

impl RuleRun {
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.started_at).num_milliseconds())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub success: usize,
    pub failed: usize,
    /// Successes over finished runs; `None` until a run has finished.
    pub success_rate: Option<f64>,
}

pub fn summarize_runs(runs: &[RuleRun]) -> RunSummary {
    let count = |s: RunStatus| runs.iter().filter(|r| r.status == s).count();
    let success = count(RunStatus::Success);
    let failed = count(RunStatus::Failed);
    let finished = success + failed;
    RunSummary {
        total: runs.len(),
        pending: count(RunStatus::Pending),
        running: count(RunStatus::Running),
        success,
        failed,
        success_rate: (finished > 0).then(|| success as f64 / finished as f64),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
