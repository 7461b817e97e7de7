use crate::action::RuleAction;
use crate::condition::Condition;
use crate::error::{CadenceError, Result};
use crate::types::{StepType, Trigger, WorkflowStatus};
use crate::validation::ValidationErrors;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// StepConfig
// ---------------------------------------------------------------------------

/// Per-type step configuration. The discriminant is the step's `step_type`,
/// so decoding goes through [`StepConfig::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepConfig {
    Condition(ConditionConfig),
    Action(ActionConfig),
    Delay(DelayConfig),
    Webhook(WebhookConfig),
    AiTask(AiTaskConfig),
    Notification(NotificationConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionConfig {
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionConfig {
    pub action: RuleAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayConfig {
    pub seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiTaskConfig {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    pub channel: String,
    pub message: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl StepConfig {
    pub fn step_type(&self) -> StepType {
        match self {
            StepConfig::Condition(_) => StepType::Condition,
            StepConfig::Action(_) => StepType::Action,
            StepConfig::Delay(_) => StepType::Delay,
            StepConfig::Webhook(_) => StepType::Webhook,
            StepConfig::AiTask(_) => StepType::AiTask,
            StepConfig::Notification(_) => StepType::Notification,
        }
    }

    /// Decode `config` into the shape owned by `step_type`.
    pub fn from_parts(step_type: StepType, config: Value, step: &str) -> Result<Self> {
        let config = match config {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let invalid = |e: serde_json::Error| CadenceError::InvalidStepConfig {
            step: step.to_string(),
            reason: e.to_string(),
        };
        Ok(match step_type {
            StepType::Condition => StepConfig::Condition(serde_json::from_value(config).map_err(invalid)?),
            StepType::Action => StepConfig::Action(serde_json::from_value(config).map_err(invalid)?),
            StepType::Delay => StepConfig::Delay(serde_json::from_value(config).map_err(invalid)?),
            StepType::Webhook => StepConfig::Webhook(serde_json::from_value(config).map_err(invalid)?),
            StepType::AiTask => StepConfig::AiTask(serde_json::from_value(config).map_err(invalid)?),
            StepType::Notification => {
                StepConfig::Notification(serde_json::from_value(config).map_err(invalid)?)
            }
        })
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match self {
            StepConfig::Condition(c) => errors.merge_prefixed("config.condition", c.condition.validate()),
            StepConfig::Action(a) => errors.merge_prefixed("config.action", a.action.validate()),
            StepConfig::Delay(d) => {
                if d.seconds == 0 {
                    errors.add("config.seconds", "Delay must be positive");
                }
            }
            StepConfig::Webhook(w) => {
                if !(w.url.starts_with("http://") || w.url.starts_with("https://")) {
                    errors.add("config.url", "Webhook URL must start with http:// or https://");
                }
            }
            StepConfig::AiTask(t) => {
                errors.require("config.prompt", &t.prompt, "Prompt is required");
                if t.max_tokens == Some(0) {
                    errors.add("config.max_tokens", "Token limit must be positive");
                }
            }
            StepConfig::Notification(n) => {
                errors.require("config.channel", &n.channel, "Channel is required");
                errors.require("config.message", &n.message, "Message is required");
            }
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// WorkflowStep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    pub config: StepConfig,
    pub position: u32,
    /// Positions of successor steps in the same workflow.
    pub next_steps: Vec<u32>,
}

impl WorkflowStep {
    pub fn step_type(&self) -> StepType {
        self.config.step_type()
    }
}

#[derive(Serialize, Deserialize)]
struct RawStep {
    #[serde(default)]
    id: String,
    name: String,
    step_type: StepType,
    #[serde(default)]
    config: Value,
    position: u32,
    #[serde(default)]
    next_steps: Vec<u32>,
}

impl TryFrom<RawStep> for WorkflowStep {
    type Error = CadenceError;

    fn try_from(raw: RawStep) -> Result<Self> {
        let config = StepConfig::from_parts(raw.step_type, raw.config, &raw.name)?;
        Ok(WorkflowStep {
            id: raw.id,
            name: raw.name,
            config,
            position: raw.position,
            next_steps: raw.next_steps,
        })
    }
}

impl From<WorkflowStep> for RawStep {
    fn from(step: WorkflowStep) -> Self {
        RawStep {
            step_type: step.config.step_type(),
            config: serde_json::to_value(&step.config).unwrap_or(Value::Null),
            id: step.id,
            name: step.name,
            position: step.position,
            next_steps: step.next_steps,
        }
    }
}

// ---------------------------------------------------------------------------
// StepGraph
// ---------------------------------------------------------------------------

/// Index of a step inside a [`StepGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(usize);

/// Arena view over a workflow's steps with every successor reference
/// resolved. Construction fails on duplicate positions or dangling
/// `next_steps` entries, so a built graph never holds a broken edge.
#[derive(Debug)]
pub struct StepGraph<'a> {
    steps: Vec<&'a WorkflowStep>,
    edges: Vec<Vec<StepId>>,
}

impl<'a> StepGraph<'a> {
    pub fn build(steps: &'a [WorkflowStep]) -> Result<Self> {
        let mut by_position: HashMap<u32, StepId> = HashMap::new();
        for (i, step) in steps.iter().enumerate() {
            if by_position.insert(step.position, StepId(i)).is_some() {
                return Err(CadenceError::DuplicatePosition(step.position));
            }
        }

        let mut edges = Vec::with_capacity(steps.len());
        for step in steps {
            let mut out = Vec::with_capacity(step.next_steps.len());
            for target in &step.next_steps {
                let id = by_position.get(target).ok_or(CadenceError::DanglingStep {
                    position: step.position,
                    target: *target,
                })?;
                out.push(*id);
            }
            edges.push(out);
        }

        Ok(Self {
            steps: steps.iter().collect(),
            edges,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: StepId) -> &'a WorkflowStep {
        self.steps[id.0]
    }

    pub fn successors(&self, id: StepId) -> &[StepId] {
        &self.edges[id.0]
    }

    /// Steps no other step points at, in position order.
    pub fn entry_points(&self) -> Vec<StepId> {
        let mut has_incoming = vec![false; self.steps.len()];
        for out in &self.edges {
            for id in out {
                has_incoming[id.0] = true;
            }
        }
        let mut entries: Vec<StepId> = (0..self.steps.len())
            .filter(|i| !has_incoming[*i])
            .map(StepId)
            .collect();
        entries.sort_by_key(|id| self.steps[id.0].position);
        entries
    }

    /// Positions along the first cycle found, or `None` for an acyclic graph.
    pub fn find_cycle(&self) -> Option<Vec<u32>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.steps.len()];
        let mut path: Vec<StepId> = Vec::new();

        for start in 0..self.steps.len() {
            if marks[start] != Mark::New {
                continue;
            }
            // Iterative DFS: (node, index of next successor to visit).
            let mut stack = vec![(StepId(start), 0usize)];
            marks[start] = Mark::Active;
            path.push(StepId(start));

            while let Some((node, next)) = stack.last_mut() {
                let node = *node;
                if let Some(&succ) = self.edges[node.0].get(*next) {
                    *next += 1;
                    match marks[succ.0] {
                        Mark::Active => {
                            let from = path.iter().position(|id| *id == succ).unwrap_or(0);
                            return Some(
                                path[from..]
                                    .iter()
                                    .map(|id| self.steps[id.0].position)
                                    .collect(),
                            );
                        }
                        Mark::New => {
                            marks[succ.0] = Mark::Active;
                            path.push(succ);
                            stack.push((succ, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node.0] = Mark::Done;
                    path.pop();
                    stack.pop();
                }
            }
        }
        None
    }

    /// Kahn ordering, ties broken by position.
    pub fn topological_order(&self) -> Result<Vec<StepId>> {
        let mut indegree = vec![0usize; self.steps.len()];
        for out in &self.edges {
            for id in out {
                indegree[id.0] += 1;
            }
        }
        let mut ready: Vec<StepId> = (0..self.steps.len())
            .filter(|i| indegree[*i] == 0)
            .map(StepId)
            .collect();
        let mut order = Vec::with_capacity(self.steps.len());

        while !ready.is_empty() {
            ready.sort_by_key(|id| std::cmp::Reverse(self.steps[id.0].position));
            let Some(id) = ready.pop() else { break };
            order.push(id);
            for succ in &self.edges[id.0] {
                indegree[succ.0] -= 1;
                if indegree[succ.0] == 0 {
                    ready.push(*succ);
                }
            }
        }

        if order.len() == self.steps.len() {
            Ok(order)
        } else {
            Err(CadenceError::CycleDetected(self.find_cycle().unwrap_or_default()))
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub trigger_type: Trigger,
    #[serde(default)]
    pub trigger_config: Value,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_status")]
    pub status: WorkflowStatus,
}

fn default_status() -> WorkflowStatus {
    WorkflowStatus::Draft
}

impl WorkflowDefinition {
    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    pub fn graph(&self) -> Result<StepGraph<'_>> {
        StepGraph::build(&self.steps)
    }

    /// Validate the step list: at least one step, each config valid, every
    /// reference resolved and no cycles.
    pub fn validate_steps(steps: &[WorkflowStep]) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if steps.is_empty() {
            errors.add("steps", "At least one step is required");
            return errors;
        }
        for (i, step) in steps.iter().enumerate() {
            let key = format!("steps[{i}]");
            errors.require(&format!("{key}.name"), &step.name, "Step name is required");
            errors.merge_prefixed(&key, step.config.validate());
        }
        match StepGraph::build(steps) {
            Ok(graph) => {
                if let Some(cycle) = graph.find_cycle() {
                    errors.add("steps", CadenceError::CycleDetected(cycle).to_string());
                }
            }
            Err(e) => errors.add("steps", e.to_string()),
        }
        errors
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name, "Name is required");
        errors.require("description", &self.description, "Description is required");
        errors.extend(Self::validate_steps(&self.steps));
        errors
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
