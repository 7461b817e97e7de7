use crate::types::MessageDirection;
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One conversation in the unified social inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub platform: String,
    pub participant: String,
    #[serde(default)]
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub direction: MessageDirection,
    pub author: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub thread_id: String,
    pub body: String,
}

impl ReplyRequest {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("thread_id", &self.thread_id, "Thread is required");
        errors.require("body", &self.body, "Reply cannot be empty");
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDraftRequest {
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDraft {
    pub thread_id: String,
    pub body: String,
}

/// Newest conversation first; ties broken by id for a stable order.
pub fn sort_threads(threads: &mut [Thread]) {
    threads.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

pub fn unread_total(threads: &[Thread]) -> u32 {
    threads.iter().map(|t| t.unread_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thread(id: &str, minutes_ago: i64, unread: u32) -> Thread {
        Thread {
            id: id.into(),
            platform: "instagram".into(),
            participant: format!("user-{id}"),
            last_message: String::new(),
            last_message_at: Utc::now() - Duration::minutes(minutes_ago),
            unread_count: unread,
        }
    }

    #[test]
    fn newest_thread_first() {
        let mut threads = vec![thread("a", 30, 1), thread("b", 5, 0), thread("c", 60, 2)];
        sort_threads(&mut threads);
        let ids: Vec<&str> = threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(unread_total(&threads), 3);
    }

    #[test]
    fn empty_reply_is_invalid() {
        let reply = ReplyRequest {
            thread_id: "t1".into(),
            body: "   ".into(),
        };
        assert!(reply.validate().contains("body"));
    }
}
