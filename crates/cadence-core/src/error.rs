use crate::validation::ValidationErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("a/b test not found: {0}")]
    AbTestNotFound(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("invalid action type: {0}")]
    InvalidActionType(String),

    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    #[error("invalid step type: {0}")]
    InvalidStepType(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid test type: {0}")]
    InvalidTestType(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid params for action '{action}': {reason}")]
    InvalidActionParams { action: String, reason: String },

    #[error("invalid config for step '{step}': {reason}")]
    InvalidStepConfig { step: String, reason: String },

    #[error("step at position {position} points to missing position {target}")]
    DanglingStep { position: u32, target: u32 },

    #[error("duplicate step position: {0}")]
    DuplicatePosition(u32),

    #[error("workflow contains a cycle through positions {0:?}")]
    CycleDetected(Vec<u32>),

    #[error("cannot {command} {entity} in state '{state}'")]
    InvalidTransition {
        command: String,
        entity: String,
        state: String,
    },

    #[error("a change to '{0}' is still pending")]
    ChangePending(String),

    #[error("'{command}' is not supported for {entity}")]
    UnsupportedCommand { command: String, entity: String },

    #[error("condition cannot be edited as a flat list: {0}")]
    UnsupportedCondition(String),

    #[error("missing template variables: {0}")]
    MissingVariables(String),

    #[error("invalid template variable: {0}")]
    InvalidVariable(String),

    #[error("wizard is closed")]
    WizardClosed,

    #[error("save failed: {0}")]
    SaveFailed(String),

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
