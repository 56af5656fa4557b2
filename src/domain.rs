//! Domain model: chat sessions, messages, tasks, task logs, task plans, feedback.
//!
//! Entities enforce their own invariants; everything that crosses a module
//! boundary is constructed through a checked constructor or `reconstruct`.

pub mod chat_session;
pub mod feedback;
pub mod message;
pub mod task;
pub mod task_log;
pub mod task_plan;

pub use chat_session::ChatSession;
pub use feedback::{Feedback, FeedbackKind};
pub use message::{Message, Role};
pub use task::{AgentKind, RetryTarget, Task, TaskEvaluation, TaskStatus};
pub use task_log::{GenerationAttempt, SearchAttempt, SearchResult, TaskLog};
pub use task_plan::TaskPlan;

/// Domain rule violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    EmptyMessageContent,
    EmptyTaskDescription,
    EmptyTaskList,
    AllTasksFailed,
    UserMessageNotFound,
    AssistantMessageNotFound,
    InvalidUserMessageRole,
    InvalidAssistantMessageRole,
    /// `complete` called while the task was not IN_PROGRESS.
    TaskNotInProgress(TaskStatus),
    /// `update_result` called while the task was not COMPLETED.
    TaskNotCompleted(TaskStatus),
    /// An attempt of the wrong kind was recorded against a task log.
    TaskLogKindMismatch(AgentKind),
    EmptyResponse,
    EmptySearchQuery,
    TaskResultNotFound,
    UnknownAgent(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::EmptyMessageContent => write!(f, "message content is empty"),
            DomainError::EmptyTaskDescription => write!(f, "task description is empty"),
            DomainError::EmptyTaskList => write!(f, "task plan has no tasks"),
            DomainError::AllTasksFailed => write!(f, "no task completed"),
            DomainError::UserMessageNotFound => write!(f, "session has no user message"),
            DomainError::AssistantMessageNotFound => {
                write!(f, "session has no assistant message")
            }
            DomainError::InvalidUserMessageRole => {
                write!(f, "only user messages can be added as user turns")
            }
            DomainError::InvalidAssistantMessageRole => {
                write!(f, "only assistant messages can be added as assistant turns")
            }
            DomainError::TaskNotInProgress(s) => {
                write!(f, "task is not in progress (status: {})", s)
            }
            DomainError::TaskNotCompleted(s) => {
                write!(f, "task is not completed (status: {})", s)
            }
            DomainError::TaskLogKindMismatch(agent) => {
                write!(f, "task log does not accept attempts for agent '{}'", agent)
            }
            DomainError::EmptyResponse => write!(f, "generation response is empty"),
            DomainError::EmptySearchQuery => write!(f, "search query is empty"),
            DomainError::TaskResultNotFound => write!(f, "task has no result"),
            DomainError::UnknownAgent(name) => write!(f, "unknown agent: {}", name),
        }
    }
}

impl std::error::Error for DomainError {}
