//! Multi-step builders for rules, A/B tests and workflows.
//!
//! A [`Wizard`] walks a form through its steps. `next()` validates the
//! current step and refuses to advance while any error key is present;
//! `previous()` always moves back. Advancing past the last step builds the
//! definition and hands it to the injected `on_save` callback. `cancel()`
//! calls `on_cancel` and drops the form.

use crate::abtest::{distribute_evenly, AbTestDefinition, Variant};
use crate::action::RuleAction;
use crate::condition::{Combinator, Comparison, Condition};
use crate::error::{CadenceError, Result};
use crate::rule::RuleDefinition;
use crate::types::{AbTestStatus, ActionType, Operator, TestType, Trigger, WorkflowStatus};
use crate::validation::ValidationErrors;
use crate::workflow::{StepConfig, WorkflowDefinition, WorkflowStep};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// WizardStep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    BasicInfo,
    Conditions,
    Variants,
    Steps,
    Actions,
}

impl WizardStep {
    pub fn title(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "Basic info",
            WizardStep::Conditions => "Conditions",
            WizardStep::Variants => "Variants",
            WizardStep::Steps => "Steps",
            WizardStep::Actions => "Actions",
        }
    }
}

/// A form the wizard can drive.
pub trait WizardForm {
    type Output;

    fn steps(&self) -> &'static [WizardStep];

    fn validate_step(&self, step: WizardStep) -> ValidationErrors;

    /// Serialize the accumulated form. Fails if any step is invalid.
    fn build(&self) -> Result<Self::Output>;

    fn validate_all(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for step in self.steps() {
            errors.extend(self.validate_step(*step));
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Editing(WizardStep),
    Submitted,
    Cancelled,
}

#[derive(Debug)]
pub enum Advance<O> {
    /// Moved forward to this step.
    Moved(WizardStep),
    /// The current step has errors; nothing moved.
    Blocked(ValidationErrors),
    /// Built and saved.
    Submitted(O),
}

type SaveFn<O> = Box<dyn FnMut(&O) -> Result<()> + Send>;
type CancelFn = Box<dyn FnOnce() + Send>;

pub struct Wizard<F: WizardForm> {
    form: Option<F>,
    index: usize,
    errors: ValidationErrors,
    state: WizardState,
    on_save: SaveFn<F::Output>,
    on_cancel: Option<CancelFn>,
}

impl<F: WizardForm> Wizard<F> {
    pub fn new(
        form: F,
        on_save: impl FnMut(&F::Output) -> Result<()> + Send + 'static,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        let first = form.steps()[0];
        Self {
            form: Some(form),
            index: 0,
            errors: ValidationErrors::new(),
            state: WizardState::Editing(first),
            on_save: Box::new(on_save),
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn current_step(&self) -> Option<WizardStep> {
        match self.state {
            WizardState::Editing(step) => Some(step),
            _ => None,
        }
    }

    /// 1-based position and step count, for "Step 2 of 3" headers.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.form.as_ref().map(|f| f.steps().len()).unwrap_or(0);
        (self.index + 1, total)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn form(&self) -> Option<&F> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Result<&mut F> {
        match self.state {
            WizardState::Editing(_) => self.form.as_mut().ok_or(CadenceError::WizardClosed),
            _ => Err(CadenceError::WizardClosed),
        }
    }

    pub fn next(&mut self) -> Result<Advance<F::Output>> {
        let WizardState::Editing(step) = self.state else {
            return Err(CadenceError::WizardClosed);
        };
        let form = self.form.as_ref().ok_or(CadenceError::WizardClosed)?;

        let errors = form.validate_step(step);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Ok(Advance::Blocked(errors));
        }
        self.errors.clear();

        let steps = form.steps();
        if self.index + 1 < steps.len() {
            self.index += 1;
            let next = steps[self.index];
            self.state = WizardState::Editing(next);
            return Ok(Advance::Moved(next));
        }

        let output = form.build()?;
        (self.on_save)(&output)?;
        self.state = WizardState::Submitted;
        tracing::debug!("wizard submitted");
        Ok(Advance::Submitted(output))
    }

    /// Move back one step. No-op on the first step.
    pub fn previous(&mut self) -> Result<WizardStep> {
        let WizardState::Editing(step) = self.state else {
            return Err(CadenceError::WizardClosed);
        };
        let form = self.form.as_ref().ok_or(CadenceError::WizardClosed)?;
        self.errors.clear();
        if self.index == 0 {
            return Ok(step);
        }
        self.index -= 1;
        let prev = form.steps()[self.index];
        self.state = WizardState::Editing(prev);
        Ok(prev)
    }

    /// Discard everything entered and notify the owner.
    pub fn cancel(&mut self) {
        if self.state == WizardState::Submitted {
            return;
        }
        self.form = None;
        self.errors.clear();
        self.state = WizardState::Cancelled;
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// Rule form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl ConditionRow {
    /// Row from raw text input; numbers and booleans are recognised.
    pub fn from_input(field: &str, operator: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            value: parse_input_value(value),
        }
    }
}

/// Interpret a text box value: JSON numbers and booleans keep their type,
/// everything else is a string.
pub fn parse_input_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(trimmed.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    pub action_type: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleForm {
    /// Set when editing an existing rule.
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub trigger_type: String,
    /// `None` with a single row builds a bare comparison.
    pub combinator: Option<Combinator>,
    pub conditions: Vec<ConditionRow>,
    pub actions: Vec<ActionRow>,
    pub enabled: bool,
}

impl Default for RuleForm {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            trigger_type: String::new(),
            combinator: None,
            conditions: Vec::new(),
            actions: Vec::new(),
            enabled: true,
        }
    }
}

const RULE_STEPS: &[WizardStep] = &[
    WizardStep::BasicInfo,
    WizardStep::Conditions,
    WizardStep::Actions,
];

impl RuleForm {
    /// Load an existing rule for editing. Nested groups have no flat-row
    /// representation and are rejected.
    pub fn from_rule(rule: &RuleDefinition) -> Result<Self> {
        let (combinator, leaves): (Option<Combinator>, Vec<&Comparison>) = match &rule.condition {
            Condition::Leaf(c) => (None, vec![c]),
            Condition::Group { op, conditions } => {
                let mut leaves = Vec::with_capacity(conditions.len());
                for child in conditions {
                    match child {
                        Condition::Leaf(c) => leaves.push(c),
                        Condition::Group { .. } => {
                            return Err(CadenceError::UnsupportedCondition(rule.condition.to_string()))
                        }
                    }
                }
                (Some(*op), leaves)
            }
        };

        Ok(Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            description: rule.description.clone(),
            trigger_type: rule.trigger.to_string(),
            combinator,
            conditions: leaves
                .into_iter()
                .map(|c| ConditionRow {
                    field: c.field.clone(),
                    operator: c.operator.to_string(),
                    value: c.value.clone(),
                })
                .collect(),
            actions: rule
                .actions
                .iter()
                .map(|a| ActionRow {
                    action_type: a.action_type().to_string(),
                    params: a.params(),
                })
                .collect(),
            enabled: rule.enabled,
        })
    }

    fn parse_action(row: &ActionRow) -> Result<RuleAction> {
        let action_type: ActionType = row.action_type.parse()?;
        RuleAction::from_parts(action_type, row.params.clone())
    }

    fn build_condition(&self) -> Result<Condition> {
        let mut leaves = Vec::with_capacity(self.conditions.len());
        for row in &self.conditions {
            leaves.push(Condition::Leaf(Comparison {
                field: row.field.trim().to_string(),
                operator: row.operator.parse()?,
                value: row.value.clone(),
            }));
        }
        Ok(match (self.combinator, leaves.len()) {
            (None, 1) => leaves.remove(0),
            (op, _) => Condition::Group {
                op: op.unwrap_or(Combinator::And),
                conditions: leaves,
            },
        })
    }
}

impl WizardForm for RuleForm {
    type Output = RuleDefinition;

    fn steps(&self) -> &'static [WizardStep] {
        RULE_STEPS
    }

    fn validate_step(&self, step: WizardStep) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match step {
            WizardStep::BasicInfo => {
                errors.require("name", &self.name, "Name is required");
                errors.require("description", &self.description, "Description is required");
                if self.trigger_type.trim().is_empty() {
                    errors.add("trigger_type", "Trigger type is required");
                } else if self.trigger_type.parse::<Trigger>().is_err() {
                    errors.add("trigger_type", "Unknown trigger type");
                }
            }
            WizardStep::Conditions => {
                validate_condition_rows(&self.conditions, &mut errors);
            }
            WizardStep::Actions => {
                if self.actions.is_empty() {
                    errors.add("actions", "At least one action is required");
                }
                for (i, row) in self.actions.iter().enumerate() {
                    let key = format!("actions[{i}]");
                    if row.action_type.trim().is_empty() {
                        errors.add(format!("{key}.type"), "Action type is required");
                        continue;
                    }
                    if row.action_type.parse::<ActionType>().is_err() {
                        errors.add(format!("{key}.type"), "Unknown action type");
                        continue;
                    }
                    match Self::parse_action(row) {
                        Ok(action) => errors.merge_prefixed(&key, action.validate()),
                        Err(e) => errors.add(format!("{key}.params"), e.to_string()),
                    }
                }
            }
            WizardStep::Variants | WizardStep::Steps => {}
        }
        errors
    }

    fn build(&self) -> Result<RuleDefinition> {
        self.validate_all().into_result()?;
        let actions = self
            .actions
            .iter()
            .map(Self::parse_action)
            .collect::<Result<Vec<_>>>()?;
        let mut rule = RuleDefinition::new(
            self.name.trim(),
            self.description.trim(),
            self.trigger_type.parse()?,
            self.build_condition()?,
            actions,
        );
        rule.id = self.id.clone();
        rule.enabled = self.enabled;
        Ok(rule)
    }
}

fn validate_condition_rows(rows: &[ConditionRow], errors: &mut ValidationErrors) {
    if rows.is_empty() {
        errors.add("conditions", "At least one condition is required");
    }
    for (i, row) in rows.iter().enumerate() {
        let key = format!("conditions[{i}]");
        errors.require(&format!("{key}.field"), &row.field, "Field is required");
        if row.operator.trim().is_empty() {
            errors.add(format!("{key}.operator"), "Operator is required");
        } else if row.operator.parse::<Operator>().is_err() {
            errors.add(format!("{key}.operator"), "Unknown operator");
        }
        let blank = match &row.value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        };
        if blank {
            errors.add(format!("{key}.value"), "Value is required");
        }
    }
}

// ---------------------------------------------------------------------------
// A/B test form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestForm {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub hypothesis: String,
    pub test_type: String,
    pub traffic_allocation: f64,
    pub variants: Vec<Variant>,
}

impl Default for AbTestForm {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            hypothesis: String::new(),
            test_type: String::new(),
            traffic_allocation: 1.0,
            variants: Vec::new(),
        }
    }
}

const AB_TEST_STEPS: &[WizardStep] = &[WizardStep::BasicInfo, WizardStep::Variants];

impl AbTestForm {
    pub fn from_test(test: &AbTestDefinition) -> Self {
        Self {
            id: test.id.clone(),
            name: test.name.clone(),
            description: test.description.clone(),
            hypothesis: test.hypothesis.clone(),
            test_type: test.test_type.to_string(),
            traffic_allocation: test.traffic_allocation,
            variants: test.variants.clone(),
        }
    }

    pub fn add_variant(&mut self, name: impl Into<String>) {
        self.variants.push(Variant {
            id: None,
            name: name.into(),
            traffic_percentage: 0.0,
            is_control: self.variants.is_empty(),
            variant_data: None,
        });
    }

    /// Overwrite every variant's share with an even split.
    pub fn split_evenly(&mut self) {
        let shares = distribute_evenly(self.variants.len());
        for (v, share) in self.variants.iter_mut().zip(shares) {
            v.traffic_percentage = share;
        }
    }
}

impl WizardForm for AbTestForm {
    type Output = AbTestDefinition;

    fn steps(&self) -> &'static [WizardStep] {
        AB_TEST_STEPS
    }

    fn validate_step(&self, step: WizardStep) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match step {
            WizardStep::BasicInfo => {
                errors.require("name", &self.name, "Name is required");
                errors.require("description", &self.description, "Description is required");
                errors.require("hypothesis", &self.hypothesis, "Hypothesis is required");
                if self.test_type.trim().is_empty() {
                    errors.add("test_type", "Test type is required");
                } else if self.test_type.parse::<TestType>().is_err() {
                    errors.add("test_type", "Unknown test type");
                }
                if !(self.traffic_allocation > 0.0 && self.traffic_allocation <= 1.0) {
                    errors.add("traffic_allocation", "Traffic allocation must be in (0, 1]");
                }
            }
            WizardStep::Variants => match self.test_type.parse::<TestType>() {
                Ok(test_type) => {
                    errors.extend(AbTestDefinition::validate_variants(test_type, &self.variants))
                }
                Err(_) => {
                    let pcts: Vec<f64> = self.variants.iter().map(|v| v.traffic_percentage).collect();
                    errors.extend(crate::abtest::validate_split(&pcts));
                }
            },
            WizardStep::Conditions | WizardStep::Steps | WizardStep::Actions => {}
        }
        errors
    }

    fn build(&self) -> Result<AbTestDefinition> {
        self.validate_all().into_result()?;
        Ok(AbTestDefinition {
            id: self.id.clone(),
            name: self.name.trim().to_string(),
            hypothesis: self.hypothesis.trim().to_string(),
            description: self.description.trim().to_string(),
            test_type: self.test_type.parse()?,
            variants: self.variants.clone(),
            traffic_allocation: self.traffic_allocation,
            status: AbTestStatus::Draft,
            results: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Workflow form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowForm {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub trigger_type: String,
    #[serde(default)]
    pub trigger_config: Value,
    pub steps: Vec<WorkflowStep>,
}

const WORKFLOW_STEPS: &[WizardStep] = &[WizardStep::BasicInfo, WizardStep::Steps];

impl WorkflowForm {
    pub fn from_workflow(workflow: &WorkflowDefinition) -> Self {
        Self {
            id: workflow.id.clone(),
            name: workflow.name.clone(),
            description: workflow.description.clone(),
            trigger_type: workflow.trigger_type.to_string(),
            trigger_config: workflow.trigger_config.clone(),
            steps: workflow.steps.clone(),
        }
    }

    /// Append a step to the linear chain, linking the previous tail to it.
    pub fn push_step(&mut self, name: impl Into<String>, config: StepConfig) -> u32 {
        let position = self.steps.iter().map(|s| s.position + 1).max().unwrap_or(0);
        if let Some(tail) = self.steps.iter_mut().max_by_key(|s| s.position) {
            tail.next_steps.push(position);
        }
        self.steps.push(WorkflowStep {
            id: format!("step-{position}"),
            name: name.into(),
            config,
            position,
            next_steps: Vec::new(),
        });
        position
    }
}

impl WizardForm for WorkflowForm {
    type Output = WorkflowDefinition;

    fn steps(&self) -> &'static [WizardStep] {
        WORKFLOW_STEPS
    }

    fn validate_step(&self, step: WizardStep) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match step {
            WizardStep::BasicInfo => {
                errors.require("name", &self.name, "Name is required");
                errors.require("description", &self.description, "Description is required");
                if self.trigger_type.trim().is_empty() {
                    errors.add("trigger_type", "Trigger type is required");
                } else if self.trigger_type.parse::<Trigger>().is_err() {
                    errors.add("trigger_type", "Unknown trigger type");
                }
            }
            WizardStep::Steps => errors.extend(WorkflowDefinition::validate_steps(&self.steps)),
            WizardStep::Conditions | WizardStep::Variants | WizardStep::Actions => {}
        }
        errors
    }

    fn build(&self) -> Result<WorkflowDefinition> {
        self.validate_all().into_result()?;
        Ok(WorkflowDefinition {
            id: self.id.clone(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            trigger_type: self.trigger_type.parse()?,
            trigger_config: self.trigger_config.clone(),
            steps: self.steps.clone(),
            enabled: false,
            status: WorkflowStatus::Draft,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::DelayConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    fn rule_form() -> RuleForm {
        RuleForm {
            name: "Pause weak posts".into(),
            description: "Pause posts under 2% engagement".into(),
            trigger_type: "post_performance".into(),
            conditions: vec![ConditionRow::from_input("engagement_rate", "lt", "0.02")],
            actions: vec![ActionRow {
                action_type: "pause_underperformer".into(),
                params: Value::Null,
            }],
            ..RuleForm::default()
        }
    }

    fn recording_wizard<F>(form: F) -> (Wizard<F>, Arc<Mutex<Vec<F::Output>>>)
    where
        F: WizardForm,
        F::Output: Clone + Send + 'static,
    {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&saved);
        let wizard = Wizard::new(
            form,
            move |out: &F::Output| {
                sink.lock().unwrap().push(out.clone());
                Ok(())
            },
            || {},
        );
        (wizard, saved)
    }

    #[test]
    fn rule_wizard_walks_three_steps_and_saves() {
        let (mut wizard, saved) = recording_wizard(rule_form());
        assert_eq!(wizard.current_step(), Some(WizardStep::BasicInfo));
        assert!(matches!(wizard.next().unwrap(), Advance::Moved(WizardStep::Conditions)));
        assert!(matches!(wizard.next().unwrap(), Advance::Moved(WizardStep::Actions)));
        let Advance::Submitted(rule) = wizard.next().unwrap() else {
            panic!("expected submission")
        };
        assert_eq!(wizard.state(), WizardState::Submitted);
        assert_eq!(saved.lock().unwrap().len(), 1);

        assert!(rule.test(&json!({"engagement_rate": 0.01})).condition_met);
        assert!(!rule.test(&json!({"engagement_rate": 0.05})).condition_met);
    }

    #[test]
    fn blocked_step_keeps_entered_data() {
        let mut form = rule_form();
        form.name = "  ".into();
        let (mut wizard, _) = recording_wizard(form);
        let Advance::Blocked(errors) = wizard.next().unwrap() else {
            panic!("expected blocked")
        };
        assert!(errors.contains("name"));
        assert_eq!(wizard.current_step(), Some(WizardStep::BasicInfo));
        assert_eq!(wizard.errors().get("name"), Some("Name is required"));
        assert_eq!(wizard.form().unwrap().description, "Pause posts under 2% engagement");

        wizard.form_mut().unwrap().name = "Fixed".into();
        assert!(matches!(wizard.next().unwrap(), Advance::Moved(_)));
        assert!(wizard.errors().is_empty());
    }

    #[test]
    fn condition_rows_require_field_operator_value() {
        let mut form = rule_form();
        form.conditions = vec![ConditionRow::from_input("", "between", "")];
        let errors = form.validate_step(WizardStep::Conditions);
        assert!(errors.contains("conditions[0].field"));
        assert!(errors.contains("conditions[0].operator"));
        assert!(errors.contains("conditions[0].value"));

        form.conditions.clear();
        assert!(form.validate_step(WizardStep::Conditions).contains("conditions"));
    }

    #[test]
    fn action_rows_require_known_type_and_params() {
        let mut form = rule_form();
        form.actions = vec![
            ActionRow::default(),
            ActionRow {
                action_type: "increase_budget_pct".into(),
                params: json!({"percent": 10}),
            },
        ];
        let errors = form.validate_step(WizardStep::Actions);
        assert!(errors.contains("actions[0].type"));
        assert!(errors.contains("actions[1].params"));
    }

    #[test]
    fn previous_then_next_reproduces_output() {
        let (mut wizard, saved) = recording_wizard(rule_form());
        wizard.next().unwrap();
        wizard.next().unwrap();
        let Advance::Submitted(_) = wizard.next().unwrap() else {
            panic!()
        };

        let (mut again, saved_again) = recording_wizard(rule_form());
        again.next().unwrap();
        again.next().unwrap();
        assert_eq!(again.previous().unwrap(), WizardStep::Conditions);
        assert_eq!(again.previous().unwrap(), WizardStep::BasicInfo);
        assert_eq!(again.previous().unwrap(), WizardStep::BasicInfo);
        again.next().unwrap();
        again.next().unwrap();
        again.next().unwrap();

        let a = serde_json::to_value(&saved.lock().unwrap()[0]).unwrap();
        let b = serde_json::to_value(&saved_again.lock().unwrap()[0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn edit_mode_round_trips_rule() {
        let mut form = rule_form();
        form.combinator = Some(Combinator::Or);
        form.conditions.push(ConditionRow::from_input("platform", "in", "instagram,tiktok"));
        form.actions.push(ActionRow {
            action_type: "send_notification".into(),
            params: json!({"channel": "email", "message": "Paused a post"}),
        });
        let mut rule = form.build().unwrap();
        rule.id = Some("rule-9".into());

        let reloaded = RuleForm::from_rule(&rule).unwrap();
        let rebuilt = reloaded.build().unwrap();
        assert_eq!(rebuilt.trigger, rule.trigger);
        assert_eq!(rebuilt.condition, rule.condition);
        assert_eq!(rebuilt.actions, rule.actions);
        assert_eq!(rebuilt.id.as_deref(), Some("rule-9"));
    }

    #[test]
    fn nested_groups_cannot_be_edited_as_rows() {
        let mut rule = rule_form().build().unwrap();
        rule.condition = Condition::all(vec![Condition::any(vec![Condition::leaf(
            "a",
            Operator::Eq,
            1,
        )])]);
        assert!(matches!(
            RuleForm::from_rule(&rule).unwrap_err(),
            CadenceError::UnsupportedCondition(_)
        ));
    }

    #[test]
    fn cancel_discards_state_and_notifies() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let mut wizard = Wizard::new(rule_form(), |_| Ok(()), move || {
            flag.store(true, Ordering::SeqCst)
        });
        wizard.next().unwrap();
        wizard.cancel();
        assert!(cancelled.load(Ordering::SeqCst));
        assert_eq!(wizard.state(), WizardState::Cancelled);
        assert!(wizard.form().is_none());
        assert!(matches!(wizard.next(), Err(CadenceError::WizardClosed)));
    }

    #[test]
    fn failed_save_stays_on_last_step() {
        let mut wizard = Wizard::new(
            rule_form(),
            |_| Err(CadenceError::SaveFailed("backend unavailable".into())),
            || {},
        );
        wizard.next().unwrap();
        wizard.next().unwrap();
        assert!(wizard.next().is_err());
        assert_eq!(wizard.current_step(), Some(WizardStep::Actions));
    }

    #[test]
    fn ab_test_wizard_enforces_split() {
        let mut form = AbTestForm {
            name: "Caption length".into(),
            description: "Short vs long".into(),
            hypothesis: "Short captions get more clicks".into(),
            test_type: "content".into(),
            ..AbTestForm::default()
        };
        for name in ["A", "B", "C"] {
            form.add_variant(name);
        }
        for v in &mut form.variants {
            v.traffic_percentage = 0.3;
        }
        let (mut wizard, saved) = recording_wizard(form);
        wizard.next().unwrap();
        let Advance::Blocked(errors) = wizard.next().unwrap() else {
            panic!("0.9 total must block")
        };
        assert!(errors.contains("traffic_split"));

        wizard.form_mut().unwrap().split_evenly();
        assert!(matches!(wizard.next().unwrap(), Advance::Submitted(_)));
        let test = &saved.lock().unwrap()[0];
        assert_eq!(test.status, AbTestStatus::Draft);
        assert!(test.variants[0].is_control);
    }

    #[test]
    fn ab_test_basic_info_requires_hypothesis() {
        let form = AbTestForm {
            name: "n".into(),
            description: "d".into(),
            test_type: "timing".into(),
            ..AbTestForm::default()
        };
        let errors = form.validate_step(WizardStep::BasicInfo);
        assert!(errors.contains("hypothesis"));
        assert!(!errors.contains("test_type"));
    }

    #[test]
    fn workflow_form_builds_linear_chain() {
        let mut form = WorkflowForm {
            name: "Welcome DM".into(),
            description: "Reply to first-time messages".into(),
            trigger_type: "inbox_message_received".into(),
            ..WorkflowForm::default()
        };
        form.push_step("Wait", StepConfig::Delay(DelayConfig { seconds: 30 }));
        form.push_step("Wait more", StepConfig::Delay(DelayConfig { seconds: 60 }));
        let workflow = form.build().unwrap();
        assert_eq!(workflow.steps[0].next_steps, vec![1]);
        assert!(workflow.steps[1].next_steps.is_empty());
        assert_eq!(workflow.status, WorkflowStatus::Draft);
        assert!(workflow.validate().is_empty());
    }
}
