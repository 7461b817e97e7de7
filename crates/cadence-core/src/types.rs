use crate::error::CadenceError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Helper macro for closed string enumerations
// ---------------------------------------------------------------------------

/// Declares a snake_case wire enum with `all()`, `as_str()`, `Display` and a
/// `FromStr` that reports unknown values through the given error variant.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $err:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CadenceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(CadenceError::$err(other.to_string())),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

wire_enum! {
    /// Event category a rule or workflow listens for.
    Trigger, InvalidTrigger {
        PostPerformance => "post_performance",
        WeeklyBriefGenerated => "weekly_brief_generated",
        InboxMessageReceived => "inbox_message_received",
        CampaignCreated => "campaign_created",
        SchedulePosted => "schedule_posted",
    }
}

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

wire_enum! {
    ActionType, InvalidActionType {
        CloneContentAndReschedule => "clone_content_and_reschedule",
        IncreaseBudgetPct => "increase_budget_pct",
        PauseUnderperformer => "pause_underperformer",
        SendNotification => "send_notification",
        PauseCampaign => "pause_campaign",
        ResumeCampaign => "resume_campaign",
    }
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

wire_enum! {
    Operator, InvalidOperator {
        Eq => "eq",
        Ne => "ne",
        Gt => "gt",
        Gte => "gte",
        Lt => "lt",
        Lte => "lte",
        In => "in",
        NotIn => "not_in",
        Contains => "contains",
        NotContains => "not_contains",
    }
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

wire_enum! {
    RunStatus, InvalidStatus {
        Pending => "pending",
        Running => "running",
        Success => "success",
        Failed => "failed",
    }
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

// ---------------------------------------------------------------------------
// StepType
// ---------------------------------------------------------------------------

wire_enum! {
    StepType, InvalidStepType {
        Condition => "condition",
        Action => "action",
        Delay => "delay",
        Webhook => "webhook",
        AiTask => "ai_task",
        Notification => "notification",
    }
}

// ---------------------------------------------------------------------------
// WorkflowStatus
// ---------------------------------------------------------------------------

wire_enum! {
    WorkflowStatus, InvalidStatus {
        Draft => "draft",
        Active => "active",
        Paused => "paused",
        Archived => "archived",
    }
}

// ---------------------------------------------------------------------------
// TestType / AbTestStatus
// ---------------------------------------------------------------------------

wire_enum! {
    TestType, InvalidTestType {
        Content => "content",
        Timing => "timing",
        Audience => "audience",
        Creative => "creative",
    }
}

wire_enum! {
    AbTestStatus, InvalidStatus {
        Draft => "draft",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
    }
}

// ---------------------------------------------------------------------------
// ControlCommand
// ---------------------------------------------------------------------------

wire_enum! {
    /// Dashboard control applied to a listed entity.
    ControlCommand, InvalidCommand {
        Toggle => "toggle",
        Delete => "delete",
        Start => "start",
        Stop => "stop",
        Retry => "retry",
    }
}

// ---------------------------------------------------------------------------
// Inbox / privacy / integrations
// ---------------------------------------------------------------------------

wire_enum! {
    MessageDirection, InvalidStatus {
        Inbound => "inbound",
        Outbound => "outbound",
    }
}

wire_enum! {
    PrivacyJobKind, InvalidStatus {
        Export => "export",
        Delete => "delete",
    }
}

wire_enum! {
    JobStatus, InvalidStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

wire_enum! {
    /// OAuth-connected platforms.
    Provider, UnknownProvider {
        Instagram => "instagram",
        Tiktok => "tiktok",
        Facebook => "facebook",
        Linkedin => "linkedin",
        Youtube => "youtube",
        X => "x",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_parses_every_wire_name() {
        for t in Trigger::all() {
            let parsed: Trigger = t.as_str().parse().unwrap();
            assert_eq!(parsed, *t);
        }
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = "between".parse::<Operator>().unwrap_err();
        assert!(matches!(err, CadenceError::InvalidOperator(ref s) if s == "between"));
    }

    #[test]
    fn serde_matches_as_str() {
        let json = serde_json::to_string(&ActionType::IncreaseBudgetPct).unwrap();
        assert_eq!(json, "\"increase_budget_pct\"");
        let step: StepType = serde_json::from_str("\"ai_task\"").unwrap();
        assert_eq!(step, StepType::AiTask);
    }

    #[test]
    fn terminal_run_statuses() {
        assert!(RunStatus::Success.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn unknown_provider_uses_provider_error() {
        assert_eq!("tiktok".parse::<Provider>().unwrap(), Provider::Tiktok);
        assert!(matches!(
            "myspace".parse::<Provider>().unwrap_err(),
            CadenceError::UnknownProvider(_)
        ));
        assert!(matches!(
            "archive".parse::<ControlCommand>().unwrap_err(),
            CadenceError::InvalidCommand(_)
        ));
    }
}
