//! Post-answer user feedback on an assistant message, unique per (message, user).

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Good,
    Bad,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Good => "good",
            FeedbackKind::Bad => "bad",
        }
    }

    pub fn parse(s: &str) -> Option<FeedbackKind> {
        match s {
            "good" => Some(FeedbackKind::Good),
            "bad" => Some(FeedbackKind::Bad),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Good/bad signal a user attached to one assistant message. Flipping the
/// polarity bumps `updated_at`; re-submitting the same polarity does not.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    id: Uuid,
    user_id: String,
    message_id: Uuid,
    kind: FeedbackKind,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(user_id: &str, message_id: Uuid, kind: FeedbackKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            message_id,
            kind,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn reconstruct(
        id: Uuid,
        user_id: &str,
        message_id: Uuid,
        kind: FeedbackKind,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            message_id,
            kind,
            created_at,
            updated_at,
        }
    }

    pub fn make_positive(&mut self) {
        if self.kind == FeedbackKind::Good {
            return;
        }
        self.kind = FeedbackKind::Good;
        self.updated_at = Utc::now();
    }

    pub fn make_negative(&mut self) {
        if self.kind == FeedbackKind::Bad {
            return;
        }
        self.kind = FeedbackKind::Bad;
        self.updated_at = Utc::now();
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.kind == FeedbackKind::Good
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[inline]
    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    #[inline]
    pub fn kind(&self) -> FeedbackKind {
        self.kind
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
