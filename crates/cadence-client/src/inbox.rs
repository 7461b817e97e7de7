use crate::client::ApiClient;
use crate::error::Result;
use crate::events::EventBus;
use cadence_core::inbox::{sort_threads, AiDraftRequest, Message, ReplyRequest, Thread};

/// Conversation list, the open thread's messages and a reply draft.
pub struct InboxPanel {
    client: ApiClient,
    events: EventBus,
    threads: Vec<Thread>,
    selected: Option<String>,
    messages: Vec<Message>,
    draft: Option<String>,
}

impl InboxPanel {
    pub fn new(client: ApiClient, events: EventBus) -> Self {
        Self {
            client,
            events,
            threads: Vec::new(),
            selected: None,
            messages: Vec::new(),
            draft: None,
        }
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    /// Load the conversation list. On failure the list is left empty.
    pub async fn load_threads(&mut self) {
        match self.client.threads().await {
            Ok(mut threads) => {
                sort_threads(&mut threads);
                self.threads = threads;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load inbox threads");
                self.events.error(format!("Could not load conversations: {e}"));
                self.threads.clear();
            }
        }
    }

    /// Open a thread and load its messages. On failure the message list is
    /// left empty.
    pub async fn open(&mut self, thread_id: &str) {
        self.selected = Some(thread_id.to_string());
        self.draft = None;
        match self.client.messages(thread_id).await {
            Ok(messages) => self.messages = messages,
            Err(e) => {
                tracing::warn!(thread_id, error = %e, "failed to load messages");
                self.events.error(format!("Could not load messages: {e}"));
                self.messages.clear();
            }
        }
        if let Some(t) = self.threads.iter_mut().find(|t| t.id == thread_id) {
            t.unread_count = 0;
        }
    }

    pub async fn reply(&mut self, body: &str) -> Result<Message> {
        let request = ReplyRequest {
            thread_id: self.selected.clone().unwrap_or_default(),
            body: body.to_string(),
        };
        request.validate().into_result()?;
        let message = self.client.reply(&request).await.inspect_err(|e| {
            self.events.error(format!("Reply failed: {e}"));
        })?;
        self.messages.push(message.clone());
        self.draft = None;
        self.events.success("Reply sent");
        Ok(message)
    }

    /// Ask the backend for a suggested reply and keep it as the draft.
    pub async fn request_draft(&mut self, tone: Option<String>) -> Result<String> {
        let request = AiDraftRequest {
            thread_id: self.selected.clone().unwrap_or_default(),
            tone,
        };
        let draft = self.client.ai_draft(&request).await.inspect_err(|e| {
            self.events.error(format!("AI draft failed: {e}"));
        })?;
        self.draft = Some(draft.body.clone());
        Ok(draft.body)
    }
}
