use crate::error::{CadenceError, Result};
use crate::types::ActionType;
use crate::validation::ValidationErrors;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// RuleAction
// ---------------------------------------------------------------------------

/// Effect executed when a rule's condition holds.
///
/// Serialized as `{"type": "...", "params": {...}}`. Each action type owns
/// one params shape; a missing `params` object reads as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAction", into = "RawAction")]
pub enum RuleAction {
    CloneContentAndReschedule(CloneParams),
    IncreaseBudgetPct(BudgetParams),
    PauseUnderperformer(PauseUnderperformerParams),
    SendNotification(NotificationParams),
    PauseCampaign(CampaignParams),
    ResumeCampaign(CampaignParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloneParams {
    pub delay_hours: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetParams {
    pub pct: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_budget: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PauseUnderperformerParams {
    #[serde(default)]
    pub notify: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationParams {
    pub channel: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

impl RuleAction {
    pub fn action_type(&self) -> ActionType {
        match self {
            RuleAction::CloneContentAndReschedule(_) => ActionType::CloneContentAndReschedule,
            RuleAction::IncreaseBudgetPct(_) => ActionType::IncreaseBudgetPct,
            RuleAction::PauseUnderperformer(_) => ActionType::PauseUnderperformer,
            RuleAction::SendNotification(_) => ActionType::SendNotification,
            RuleAction::PauseCampaign(_) => ActionType::PauseCampaign,
            RuleAction::ResumeCampaign(_) => ActionType::ResumeCampaign,
        }
    }

    /// Decode `params` into the shape owned by `action_type`.
    pub fn from_parts(action_type: ActionType, params: Value) -> Result<Self> {
        let params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let invalid = |e: serde_json::Error| CadenceError::InvalidActionParams {
            action: action_type.to_string(),
            reason: e.to_string(),
        };
        let action = match action_type {
            ActionType::CloneContentAndReschedule => {
                RuleAction::CloneContentAndReschedule(serde_json::from_value(params).map_err(invalid)?)
            }
            ActionType::IncreaseBudgetPct => {
                RuleAction::IncreaseBudgetPct(serde_json::from_value(params).map_err(invalid)?)
            }
            ActionType::PauseUnderperformer => {
                RuleAction::PauseUnderperformer(serde_json::from_value(params).map_err(invalid)?)
            }
            ActionType::SendNotification => {
                RuleAction::SendNotification(serde_json::from_value(params).map_err(invalid)?)
            }
            ActionType::PauseCampaign => {
                RuleAction::PauseCampaign(serde_json::from_value(params).map_err(invalid)?)
            }
            ActionType::ResumeCampaign => {
                RuleAction::ResumeCampaign(serde_json::from_value(params).map_err(invalid)?)
            }
        };
        Ok(action)
    }

    /// The params object as it appears on the wire.
    pub fn params(&self) -> Value {
        let encoded = match self {
            RuleAction::CloneContentAndReschedule(p) => serde_json::to_value(p),
            RuleAction::IncreaseBudgetPct(p) => serde_json::to_value(p),
            RuleAction::PauseUnderperformer(p) => serde_json::to_value(p),
            RuleAction::SendNotification(p) => serde_json::to_value(p),
            RuleAction::PauseCampaign(p) | RuleAction::ResumeCampaign(p) => serde_json::to_value(p),
        };
        // Plain structs of strings and numbers always encode.
        encoded.unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Range checks on params. Keys are relative to the action (`params.pct`).
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match self {
            RuleAction::CloneContentAndReschedule(p) => {
                if p.delay_hours == 0 {
                    errors.add("params.delay_hours", "Delay must be at least one hour");
                }
            }
            RuleAction::IncreaseBudgetPct(p) => {
                if !(p.pct > 0.0 && p.pct <= 100.0) {
                    errors.add("params.pct", "Percentage must be between 0 and 100");
                }
                if matches!(p.max_daily_budget, Some(b) if b <= 0.0) {
                    errors.add("params.max_daily_budget", "Budget cap must be positive");
                }
            }
            RuleAction::SendNotification(p) => {
                errors.require("params.channel", &p.channel, "Channel is required");
                errors.require("params.message", &p.message, "Message is required");
            }
            RuleAction::PauseUnderperformer(_)
            | RuleAction::PauseCampaign(_)
            | RuleAction::ResumeCampaign(_) => {}
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    action_type: ActionType,
    #[serde(default)]
    params: Value,
}

impl TryFrom<RawAction> for RuleAction {
    type Error = CadenceError;

    fn try_from(raw: RawAction) -> Result<Self> {
        RuleAction::from_parts(raw.action_type, raw.params)
    }
}

impl From<RuleAction> for RawAction {
    fn from(action: RuleAction) -> Self {
        RawAction {
            action_type: action.action_type(),
            params: action.params(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_params_default_to_empty() {
        let action: RuleAction = serde_json::from_value(json!({"type": "pause_underperformer"})).unwrap();
        assert_eq!(
            action,
            RuleAction::PauseUnderperformer(PauseUnderperformerParams { notify: false })
        );
    }

    #[test]
    fn params_decode_into_variant_shape() {
        let action: RuleAction = serde_json::from_value(json!({
            "type": "increase_budget_pct",
            "params": {"pct": 15.0, "max_daily_budget": 250.0}
        }))
        .unwrap();
        let RuleAction::IncreaseBudgetPct(p) = &action else {
            panic!("expected IncreaseBudgetPct")
        };
        assert_eq!(p.pct, 15.0);
        assert_eq!(action.action_type(), ActionType::IncreaseBudgetPct);
    }

    #[test]
    fn wrong_field_name_is_rejected() {
        let err = RuleAction::from_parts(
            ActionType::IncreaseBudgetPct,
            json!({"percent": 15.0}),
        )
        .unwrap_err();
        assert!(matches!(err, CadenceError::InvalidActionParams { .. }));
    }

    #[test]
    fn serializes_type_and_params() {
        let action = RuleAction::SendNotification(NotificationParams {
            channel: "slack".into(),
            message: "Post underperforming".into(),
        });
        let v = serde_json::to_value(&action).unwrap();
        assert_eq!(v["type"], "send_notification");
        assert_eq!(v["params"]["channel"], "slack");
    }

    #[test]
    fn validate_checks_ranges() {
        let action = RuleAction::IncreaseBudgetPct(BudgetParams {
            pct: 150.0,
            max_daily_budget: Some(0.0),
        });
        let errors = action.validate();
        assert!(errors.contains("params.pct"));
        assert!(errors.contains("params.max_daily_budget"));

        let ok = RuleAction::CloneContentAndReschedule(CloneParams {
            delay_hours: 24,
            platforms: vec!["instagram".into()],
        });
        assert!(ok.validate().is_empty());
    }
}
