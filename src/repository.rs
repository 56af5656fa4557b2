//! Persistence: SQLite database plus the chat-session and feedback
//! repositories. Repositories bridge the blocking driver into async with
//! `spawn_blocking` and map rows back into validated domain entities.

pub mod chat_session;
pub mod db;
pub mod feedback;

pub use chat_session::ChatSessionRepository;
pub use db::Database;
pub use feedback::FeedbackRepository;

/// Repository errors, wrapping the underlying cause.
#[derive(Debug)]
pub enum RepositoryError {
    Save(String),
    Fetch(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::Save(s) => write!(f, "repository save: {}", s),
            RepositoryError::Fetch(s) => write!(f, "repository fetch: {}", s),
        }
    }
}

impl std::error::Error for RepositoryError {}
