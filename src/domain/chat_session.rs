//! Chat session: the per-conversation history of messages and task plans.
//!
//! The id is supplied by the caller (the chat adapter derives it from
//! channel + thread); the session is created on the first turn, persisted at
//! the end of each turn, and never deleted by this crate.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::message::{Message, Role};
use crate::domain::task_plan::TaskPlan;
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    id: String,
    thread_id: Option<String>,
    user_id: String,
    channel_id: String,
    messages: Vec<Message>,
    task_plans: Vec<TaskPlan>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// New empty session for a conversation id seen for the first time.
    pub fn new(id: &str, thread_id: Option<&str>, user_id: &str, channel_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            thread_id: thread_id.map(str::to_string),
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            messages: Vec::new(),
            task_plans: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a persisted session. Loaded sessions carry the same
    /// invariants as freshly built ones; the repository feeds this with
    /// already-validated messages and plans.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: &str,
        thread_id: Option<&str>,
        user_id: &str,
        channel_id: &str,
        messages: Vec<Message>,
        task_plans: Vec<TaskPlan>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            thread_id: thread_id.map(str::to_string),
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            messages,
            task_plans,
            created_at,
            updated_at,
        }
    }

    /// Append a user turn. Any other role is rejected.
    pub fn add_user_message(&mut self, message: Message) -> Result<(), DomainError> {
        if message.role() != Role::User {
            return Err(DomainError::InvalidUserMessageRole);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Append an assistant turn. Any other role is rejected.
    pub fn add_assistant_message(&mut self, message: Message) -> Result<(), DomainError> {
        if message.role() != Role::Assistant {
            return Err(DomainError::InvalidAssistantMessageRole);
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn add_task_plan(&mut self, task_plan: TaskPlan) {
        self.task_plans.push(task_plan);
    }

    /// Most recent user message; a turn cannot run without one.
    pub fn last_user_message(&self) -> Result<&Message, DomainError> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::User)
            .ok_or(DomainError::UserMessageNotFound)
    }

    /// Id of the most recent assistant message (the key a later feedback
    /// submission refers to).
    pub fn last_assistant_message_id(&self) -> Result<Uuid, DomainError> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::Assistant)
            .map(Message::id)
            .ok_or(DomainError::AssistantMessageNotFound)
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    #[inline]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[inline]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[inline]
    pub fn task_plans(&self) -> &[TaskPlan] {
        &self.task_plans
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Bump the update timestamp; called by the repository on save.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
