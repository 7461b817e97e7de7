//! Demo data loaded by `serve --seed`.

use cadence_core::abtest::{AbTestDefinition, Variant, VariantData};
use cadence_core::action::{BudgetParams, NotificationParams, PauseUnderperformerParams, RuleAction};
use cadence_core::ai::{AiBudget, AiUsage};
use cadence_core::condition::Condition;
use cadence_core::inbox::{Message, Thread};
use cadence_core::integration::Integration;
use cadence_core::rule::{RuleDefinition, RuleRun};
use cadence_core::template::Template;
use cadence_core::types::{
    AbTestStatus, MessageDirection, Operator, Provider, RunStatus, TestType, Trigger, WorkflowStatus,
};
use cadence_core::workflow::{
    ActionConfig, ConditionConfig, DelayConfig, NotificationConfig, StepConfig, WorkflowDefinition,
    WorkflowStep,
};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::store::Store;

pub fn demo_store() -> Store {
    let now = Utc::now();
    let mut store = Store::default();

    let mut pause = RuleDefinition::new(
        "Pause weak posts",
        "Pause posts that fall under 2% engagement",
        Trigger::PostPerformance,
        Condition::leaf("engagement_rate", Operator::Lt, 0.02),
        vec![RuleAction::PauseUnderperformer(PauseUnderperformerParams { notify: true })],
    );
    pause.id = Some("rule-pause".into());
    pause.created_at = Some(now - Duration::days(6));
    pause.updated_at = pause.created_at;

    let mut boost = RuleDefinition::new(
        "Boost winners",
        "Raise budget for posts with strong reach and engagement",
        Trigger::PostPerformance,
        Condition::all(vec![
            Condition::leaf("engagement_rate", Operator::Gte, 0.08),
            Condition::leaf("reach", Operator::Gt, 5000),
        ]),
        vec![RuleAction::IncreaseBudgetPct(BudgetParams {
            pct: 20.0,
            max_daily_budget: Some(150.0),
        })],
    );
    boost.id = Some("rule-boost".into());
    boost.created_at = Some(now - Duration::days(3));
    boost.updated_at = boost.created_at;

    let mut notify = RuleDefinition::new(
        "Flag VIP messages",
        "Ping the team when a tagged VIP writes in",
        Trigger::InboxMessageReceived,
        Condition::leaf("tags", Operator::Contains, "vip"),
        vec![RuleAction::SendNotification(NotificationParams {
            channel: "slack".into(),
            message: "VIP message waiting in the inbox".into(),
        })],
    );
    notify.id = Some("rule-vip".into());
    notify.enabled = false;
    store.rules = vec![pause, boost, notify];

    store.runs = vec![
        RuleRun {
            id: "run-seed-1".into(),
            rule_id: "rule-pause".into(),
            status: RunStatus::Success,
            started_at: now - Duration::hours(5),
            completed_at: Some(now - Duration::hours(5) + Duration::seconds(2)),
            meta: json!({"trigger": "post_performance", "actions": ["pause_underperformer"]}),
        },
        RuleRun {
            id: "run-seed-2".into(),
            rule_id: "rule-boost".into(),
            status: RunStatus::Failed,
            started_at: now - Duration::hours(2),
            completed_at: Some(now - Duration::hours(2) + Duration::seconds(4)),
            meta: json!({"trigger": "post_performance", "error": "ad account rate limited"}),
        },
    ];

    store.workflows = vec![WorkflowDefinition {
        id: Some("wf-welcome".into()),
        name: "Welcome new followers".into(),
        description: "Check the message, wait, then notify the team".into(),
        trigger_type: Trigger::InboxMessageReceived,
        trigger_config: json!({}),
        steps: vec![
            WorkflowStep {
                id: "step-1".into(),
                name: "First contact?".into(),
                config: StepConfig::Condition(ConditionConfig {
                    condition: Condition::leaf("is_first_message", Operator::Eq, true),
                }),
                position: 1,
                next_steps: vec![2],
            },
            WorkflowStep {
                id: "step-2".into(),
                name: "Wait ten minutes".into(),
                config: StepConfig::Delay(DelayConfig { seconds: 600 }),
                position: 2,
                next_steps: vec![3],
            },
            WorkflowStep {
                id: "step-3".into(),
                name: "Tell the team".into(),
                config: StepConfig::Notification(NotificationConfig {
                    channel: "slack".into(),
                    message: "New follower said hello".into(),
                    recipients: vec!["#community".into()],
                }),
                position: 3,
                next_steps: vec![4],
            },
            WorkflowStep {
                id: "step-4".into(),
                name: "Pause if spam".into(),
                config: StepConfig::Action(ActionConfig {
                    action: RuleAction::PauseUnderperformer(PauseUnderperformerParams::default()),
                }),
                position: 4,
                next_steps: vec![],
            },
        ],
        enabled: true,
        status: WorkflowStatus::Active,
    }];

    store.ab_tests = vec![AbTestDefinition {
        id: Some("abt-caption".into()),
        name: "Caption length".into(),
        hypothesis: "Short captions get more saves".into(),
        description: String::new(),
        test_type: TestType::Content,
        variants: vec![
            Variant {
                id: Some("var-long".into()),
                name: "Long caption".into(),
                traffic_percentage: 0.5,
                is_control: true,
                variant_data: Some(VariantData::Content {
                    caption: "Everything you need to know about our spring drop, in one post.".into(),
                    hashtags: vec!["spring".into()],
                    media_urls: vec![],
                }),
            },
            Variant {
                id: Some("var-short".into()),
                name: "Short caption".into(),
                traffic_percentage: 0.5,
                is_control: false,
                variant_data: Some(VariantData::Content {
                    caption: "Spring is here.".into(),
                    hashtags: vec!["spring".into()],
                    media_urls: vec![],
                }),
            },
        ],
        traffic_allocation: 0.8,
        status: AbTestStatus::Draft,
        results: vec![],
    }];

    store.threads = vec![
        Thread {
            id: "thread-ana".into(),
            platform: "instagram".into(),
            participant: "ana.lima".into(),
            last_message: "Do you ship to Lisbon?".into(),
            last_message_at: now - Duration::minutes(12),
            unread_count: 1,
        },
        Thread {
            id: "thread-jo".into(),
            platform: "tiktok".into(),
            participant: "jo_makes".into(),
            last_message: "Love the new colours".into(),
            last_message_at: now - Duration::hours(4),
            unread_count: 0,
        },
    ];
    store.messages = vec![
        Message {
            id: "msg-1".into(),
            thread_id: "thread-ana".into(),
            direction: MessageDirection::Inbound,
            author: "ana.lima".into(),
            body: "Do you ship to Lisbon?".into(),
            sent_at: now - Duration::minutes(12),
        },
        Message {
            id: "msg-2".into(),
            thread_id: "thread-jo".into(),
            direction: MessageDirection::Inbound,
            author: "jo_makes".into(),
            body: "Love the new colours".into(),
            sent_at: now - Duration::hours(4),
        },
    ];

    store.ai_usage = AiUsage {
        requests_today: 14,
        tokens_today: 9_200,
        tokens_month: 184_000,
        cost_today: 0.42,
        cost_month: 7.9,
        reset_at: Some(now - Duration::hours(9)),
    };
    store.ai_budget = AiBudget {
        daily_limit: 2.0,
        monthly_limit: 40.0,
        ..AiBudget::default()
    };

    store.templates = vec![Template {
        id: Some("tpl-launch".into()),
        name: "Product launch".into(),
        platform: Some("instagram".into()),
        body: "{{product}} is live! Shop now at {{url}}".into(),
    }];

    store.integrations = vec![Integration {
        provider: Provider::Instagram,
        connected: true,
        account_name: Some("@cadence.demo".into()),
        connected_at: Some(now - Duration::days(30)),
    }];

    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_definitions_are_valid() {
        let store = demo_store();
        for rule in &store.rules {
            assert!(rule.validate().is_empty(), "{}", rule.name);
        }
        for wf in &store.workflows {
            assert!(wf.validate().is_empty(), "{}", wf.name);
        }
        for test in &store.ab_tests {
            assert!(test.validate().is_empty(), "{}", test.name);
        }
    }
}
