use crate::abtest::AbTestDefinition;
use crate::error::{CadenceError, Result};
use crate::rule::{RuleDefinition, RuleRun};
use crate::types::{AbTestStatus, ControlCommand, RunStatus, Trigger, WorkflowStatus};
use crate::workflow::WorkflowDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// An entity shown in a dashboard list.
pub trait Listing: Clone {
    /// Entity name used in command errors ("rule", "workflow").
    const ENTITY: &'static str;

    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str {
        ""
    }
    fn status(&self) -> &'static str;
    fn kind(&self) -> Option<&'static str> {
        None
    }
    fn trigger(&self) -> Option<Trigger> {
        None
    }

    fn supports(command: ControlCommand) -> bool;

    /// Mutate in place for a non-delete command. Must check the transition
    /// before touching any field.
    fn apply(&mut self, command: ControlCommand) -> Result<()>;
}

fn invalid_transition<T: Listing>(item: &T, command: ControlCommand) -> CadenceError {
    CadenceError::InvalidTransition {
        command: command.to_string(),
        entity: T::ENTITY.to_string(),
        state: item.status().to_string(),
    }
}

fn unsupported<T: Listing>(command: ControlCommand) -> CadenceError {
    CadenceError::UnsupportedCommand {
        command: command.to_string(),
        entity: T::ENTITY.to_string(),
    }
}

impl Listing for RuleDefinition {
    const ENTITY: &'static str = "rule";

    fn id(&self) -> &str {
        self.id_or_empty()
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn status(&self) -> &'static str {
        if self.enabled {
            "enabled"
        } else {
            "disabled"
        }
    }
    fn trigger(&self) -> Option<Trigger> {
        Some(self.trigger)
    }

    fn supports(command: ControlCommand) -> bool {
        matches!(command, ControlCommand::Toggle | ControlCommand::Delete)
    }

    fn apply(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Toggle => {
                self.enabled = !self.enabled;
                Ok(())
            }
            other => Err(unsupported::<Self>(other)),
        }
    }
}

impl Listing for WorkflowDefinition {
    const ENTITY: &'static str = "workflow";

    fn id(&self) -> &str {
        self.id_or_empty()
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn status(&self) -> &'static str {
        self.status.as_str()
    }
    fn trigger(&self) -> Option<Trigger> {
        Some(self.trigger_type)
    }

    fn supports(command: ControlCommand) -> bool {
        !matches!(command, ControlCommand::Retry)
    }

    fn apply(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Toggle => self.enabled = !self.enabled,
            ControlCommand::Start => {
                if !matches!(self.status, WorkflowStatus::Draft | WorkflowStatus::Paused) {
                    return Err(invalid_transition(self, command));
                }
                self.status = WorkflowStatus::Active;
                self.enabled = true;
            }
            ControlCommand::Stop => {
                if self.status != WorkflowStatus::Active {
                    return Err(invalid_transition(self, command));
                }
                self.status = WorkflowStatus::Paused;
            }
            other => return Err(unsupported::<Self>(other)),
        }
        Ok(())
    }
}

impl Listing for AbTestDefinition {
    const ENTITY: &'static str = "a/b test";

    fn id(&self) -> &str {
        self.id_or_empty()
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn status(&self) -> &'static str {
        self.status.as_str()
    }
    fn kind(&self) -> Option<&'static str> {
        Some(self.test_type.as_str())
    }

    fn supports(command: ControlCommand) -> bool {
        matches!(
            command,
            ControlCommand::Start | ControlCommand::Stop | ControlCommand::Delete
        )
    }

    fn apply(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Start => {
                if !matches!(self.status, AbTestStatus::Draft | AbTestStatus::Paused) {
                    return Err(invalid_transition(self, command));
                }
                self.status = AbTestStatus::Running;
            }
            ControlCommand::Stop => {
                if self.status != AbTestStatus::Running {
                    return Err(invalid_transition(self, command));
                }
                self.status = AbTestStatus::Completed;
            }
            other => return Err(unsupported::<Self>(other)),
        }
        Ok(())
    }
}

impl Listing for RuleRun {
    const ENTITY: &'static str = "run";

    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.rule_id
    }
    fn status(&self) -> &'static str {
        self.status.as_str()
    }

    fn supports(command: ControlCommand) -> bool {
        command == ControlCommand::Retry
    }

    fn apply(&mut self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Retry => {
                if self.status != RunStatus::Failed {
                    return Err(invalid_transition(self, command));
                }
                self.status = RunStatus::Pending;
                self.completed_at = None;
                Ok(())
            }
            other => Err(unsupported::<Self>(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Case-insensitive substring of name or description.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub trigger: Option<Trigger>,
}

impl Filter {
    pub fn matches<T: Listing>(&self, item: &T) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = item.name().to_lowercase().contains(&needle)
                || item.description().to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if item.status() != status {
                return false;
            }
        }
        if let Some(kind) = &self.kind {
            if item.kind() != Some(kind.as_str()) {
                return false;
            }
        }
        if let Some(trigger) = self.trigger {
            if item.trigger() != Some(trigger) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// An applied-but-unconfirmed control change. Hand it back to
/// [`Dashboard::commit`] or [`Dashboard::rollback`].
#[derive(Debug, Clone)]
#[must_use = "a pending change must be committed or rolled back"]
pub struct PendingChange<T> {
    pub id: String,
    pub command: ControlCommand,
    prior: T,
    index: usize,
    generation: u64,
}

impl<T> PendingChange<T> {
    pub fn prior(&self) -> &T {
        &self.prior
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard<T> {
    items: Vec<T>,
    /// Ids with an unresolved [`PendingChange`]; at most one per item.
    pending: HashSet<String>,
    /// Bumped by every [`Dashboard::replace_all`].
    generation: u64,
}

impl<T> Default for Dashboard<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pending: HashSet::new(),
            generation: 0,
        }
    }
}

impl<T: Listing> Dashboard<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Replace the list with a fresh fetch. Changes begun before this
    /// point no longer roll back.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
        self.generation += 1;
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn filtered(&self, filter: &Filter) -> Vec<&T> {
        self.items.iter().filter(|i| filter.matches(*i)).collect()
    }

    /// Insert or replace by id.
    pub fn upsert(&mut self, item: T) {
        match self.items.iter().position(|i| i.id() == item.id()) {
            Some(idx) => self.items[idx] = item,
            None => self.items.push(item),
        }
    }

    /// Apply `command` to the item optimistically. Only one change per item
    /// may be outstanding.
    pub fn begin(&mut self, id: &str, command: ControlCommand) -> Result<PendingChange<T>> {
        if !T::supports(command) {
            return Err(unsupported::<T>(command));
        }
        if self.pending.contains(id) {
            return Err(CadenceError::ChangePending(id.to_string()));
        }
        let index = self
            .items
            .iter()
            .position(|i| i.id() == id)
            .ok_or_else(|| CadenceError::ItemNotFound(id.to_string()))?;
        let prior = self.items[index].clone();

        if command == ControlCommand::Delete {
            self.items.remove(index);
        } else {
            self.items[index].apply(command)?;
        }
        self.pending.insert(id.to_string());
        Ok(PendingChange {
            id: id.to_string(),
            command,
            prior,
            index,
            generation: self.generation,
        })
    }

    /// Keep the optimistic state. `confirmed` replaces it with the server's
    /// copy when one was returned.
    pub fn commit(&mut self, change: PendingChange<T>, confirmed: Option<T>) {
        self.pending.remove(&change.id);
        if let Some(item) = confirmed {
            if change.command != ControlCommand::Delete {
                self.upsert(item);
            }
        }
    }

    /// Restore the exact prior item, unless a fresh fetch has replaced the
    /// list since the change began.
    pub fn rollback(&mut self, change: PendingChange<T>) {
        self.pending.remove(&change.id);
        if change.generation != self.generation {
            return;
        }
        match self.items.iter().position(|i| i.id() == change.id) {
            Some(idx) => self.items[idx] = change.prior,
            None => {
                let at = change.index.min(self.items.len());
                self.items.insert(at, change.prior);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abtest::Variant;
    use crate::action::{PauseUnderperformerParams, RuleAction};
    use crate::condition::Condition;
    use crate::types::{Operator, TestType};
    use chrono::Utc;

    fn rule(id: &str, name: &str, trigger: Trigger) -> RuleDefinition {
        let mut r = RuleDefinition::new(
            name,
            format!("{name} automatically"),
            trigger,
            Condition::leaf("engagement_rate", Operator::Lt, 0.02),
            vec![RuleAction::PauseUnderperformer(PauseUnderperformerParams::default())],
        );
        r.id = Some(id.into());
        r
    }

    fn ab_test(id: &str, status: AbTestStatus) -> AbTestDefinition {
        AbTestDefinition {
            id: Some(id.into()),
            name: "Caption length".into(),
            hypothesis: "Short wins".into(),
            description: String::new(),
            test_type: TestType::Content,
            variants: vec![
                Variant {
                    id: None,
                    name: "A".into(),
                    traffic_percentage: 0.5,
                    is_control: true,
                    variant_data: None,
                },
                Variant {
                    id: None,
                    name: "B".into(),
                    traffic_percentage: 0.5,
                    is_control: false,
                    variant_data: None,
                },
            ],
            traffic_allocation: 1.0,
            status,
            results: Vec::new(),
        }
    }

    fn rules() -> Dashboard<RuleDefinition> {
        Dashboard::new(vec![
            rule("r1", "Pause weak posts", Trigger::PostPerformance),
            rule("r2", "Boost winners", Trigger::PostPerformance),
            rule("r3", "Welcome DM", Trigger::InboxMessageReceived),
        ])
    }

    #[test]
    fn filter_search_is_case_insensitive() {
        let board = rules();
        let filter = Filter {
            search: Some("WEAK".into()),
            ..Filter::default()
        };
        let hits = board.filtered(&filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "r1");

        let by_desc = Filter {
            search: Some("winners automatically".into()),
            ..Filter::default()
        };
        assert_eq!(board.filtered(&by_desc).len(), 1);
    }

    #[test]
    fn filter_trigger_and_status_are_exact() {
        let mut board = rules();
        let change = board.begin("r2", ControlCommand::Toggle).unwrap();
        board.commit(change, None);
        let filter = Filter {
            status: Some("enabled".into()),
            trigger: Some(Trigger::PostPerformance),
            ..Filter::default()
        };
        let hits: Vec<&str> = board.filtered(&filter).iter().map(|r| r.id()).collect();
        assert_eq!(hits, vec!["r1"]);
    }

    #[test]
    fn toggle_rollback_restores_prior() {
        let mut board = rules();
        let change = board.begin("r1", ControlCommand::Toggle).unwrap();
        assert!(!board.get("r1").unwrap().enabled);
        board.rollback(change);
        assert!(board.get("r1").unwrap().enabled);
    }

    #[test]
    fn delete_rollback_reinserts_at_index() {
        let mut board = rules();
        let change = board.begin("r2", ControlCommand::Delete).unwrap();
        assert_eq!(board.items().len(), 2);
        board.rollback(change);
        let ids: Vec<&str> = board.items().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn unsupported_command_is_rejected_before_mutation() {
        let mut board = rules();
        let err = board.begin("r1", ControlCommand::Start).unwrap_err();
        assert!(matches!(err, CadenceError::UnsupportedCommand { .. }));
        assert!(board.get("r1").unwrap().enabled);
    }

    #[test]
    fn completed_test_cannot_start() {
        let mut board = Dashboard::new(vec![ab_test("t1", AbTestStatus::Completed)]);
        let err = board.begin("t1", ControlCommand::Start).unwrap_err();
        assert!(matches!(err, CadenceError::InvalidTransition { .. }));
        assert_eq!(board.get("t1").unwrap().status, AbTestStatus::Completed);
    }

    #[test]
    fn ab_test_start_then_stop() {
        let mut board = Dashboard::new(vec![ab_test("t1", AbTestStatus::Draft)]);
        let c = board.begin("t1", ControlCommand::Start).unwrap();
        board.commit(c, None);
        assert_eq!(board.get("t1").unwrap().status, AbTestStatus::Running);
        let c = board.begin("t1", ControlCommand::Stop).unwrap();
        board.commit(c, None);
        assert_eq!(board.get("t1").unwrap().status, AbTestStatus::Completed);
    }

    #[test]
    fn retry_only_from_failed() {
        let run = |id: &str, status| RuleRun {
            id: id.into(),
            rule_id: "r1".into(),
            status,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            meta: serde_json::Value::Null,
        };
        let mut board = Dashboard::new(vec![run("a", RunStatus::Failed), run("b", RunStatus::Success)]);
        let c = board.begin("a", ControlCommand::Retry).unwrap();
        board.commit(c, None);
        let a = board.get("a").unwrap();
        assert_eq!(a.status, RunStatus::Pending);
        assert!(a.completed_at.is_none());
        assert!(board.begin("b", ControlCommand::Retry).is_err());
    }

    #[test]
    fn commit_takes_server_copy() {
        let mut board = rules();
        let change = board.begin("r3", ControlCommand::Toggle).unwrap();
        let mut server = change.prior().clone();
        server.enabled = false;
        server.name = "Welcome DM v2".into();
        board.commit(change, Some(server));
        assert_eq!(board.get("r3").unwrap().name, "Welcome DM v2");
    }

    #[test]
    fn second_change_on_same_item_is_rejected() {
        let mut board = rules();
        let first = board.begin("r1", ControlCommand::Toggle).unwrap();
        assert!(board.is_pending("r1"));
        let err = board.begin("r1", ControlCommand::Toggle).unwrap_err();
        assert!(matches!(err, CadenceError::ChangePending(ref id) if id == "r1"));
        assert!(!board.get("r1").unwrap().enabled, "rejected change must not mutate");

        // Other items are unaffected.
        let other = board.begin("r2", ControlCommand::Toggle).unwrap();
        board.rollback(other);

        board.rollback(first);
        assert!(board.get("r1").unwrap().enabled);
        assert!(!board.is_pending("r1"));
        let again = board.begin("r1", ControlCommand::Toggle).unwrap();
        board.commit(again, None);
        assert!(!board.get("r1").unwrap().enabled);
    }

    #[test]
    fn rollback_after_refresh_keeps_fresh_copy() {
        let mut board = rules();
        let change = board.begin("r1", ControlCommand::Toggle).unwrap();
        let mut fresh = rules().items().to_vec();
        fresh[0].name = "Pause weak posts v2".into();
        board.replace_all(fresh);
        board.rollback(change);
        let r1 = board.get("r1").unwrap();
        assert_eq!(r1.name, "Pause weak posts v2");
        assert!(r1.enabled);
        assert!(!board.is_pending("r1"));
    }

    #[test]
    fn missing_item_is_not_found() {
        let mut board = rules();
        assert!(matches!(
            board.begin("nope", ControlCommand::Delete).unwrap_err(),
            CadenceError::ItemNotFound(_)
        ));
    }
}
