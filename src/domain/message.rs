//! Chat message: role, non-empty content, creation timestamp. Immutable once built.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::DomainError;

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a stored role label. Unknown labels yield `None`.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single turn in a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: Uuid,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    /// New message with a fresh id. Rejects content that is empty after trim.
    pub fn new(role: Role, content: &str) -> Result<Self, DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::EmptyMessageContent);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn user(content: &str) -> Result<Self, DomainError> {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: &str) -> Result<Self, DomainError> {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: &str) -> Result<Self, DomainError> {
        Self::new(Role::System, content)
    }

    /// Rebuild a persisted message. Same content invariant as `new`.
    pub fn reconstruct(
        id: Uuid,
        role: Role,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::EmptyMessageContent);
        }
        Ok(Self {
            id,
            role,
            content: content.to_string(),
            created_at,
        })
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_labels_roundtrip() {
        for role in [Role::System, Role::User, Role::Assistant] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("tool"), None);
    }

    #[test]
    fn new_message_has_fresh_id_and_role() {
        let a = Message::user("Hi").unwrap();
        let b = Message::user("Hi").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.role(), Role::User);
        assert_eq!(a.content(), "Hi");
    }

    #[test]
    fn empty_content_rejected() {
        assert_eq!(
            Message::assistant("").unwrap_err(),
            DomainError::EmptyMessageContent
        );
        assert_eq!(
            Message::user("   \n\t ").unwrap_err(),
            DomainError::EmptyMessageContent
        );
    }

    #[test]
    fn reconstruct_keeps_identity() {
        let original = Message::assistant("answer").unwrap();
        let copy = Message::reconstruct(
            original.id(),
            original.role(),
            original.content(),
            original.created_at(),
        )
        .unwrap();
        assert_eq!(copy, original);
    }

    #[test]
    fn reconstruct_rejects_empty_content() {
        let err = Message::reconstruct(Uuid::new_v4(), Role::User, " ", Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::EmptyMessageContent);
    }
}
