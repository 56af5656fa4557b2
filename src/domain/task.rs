//! Task: one unit of work dispatched to exactly one agent kind.
//!
//! Status transitions:
//!   IN_PROGRESS --complete(non-empty)--> COMPLETED
//!   IN_PROGRESS --complete(empty)-----> FAILED
//!   COMPLETED   --update_result(ok)---> COMPLETED (result replaced)
//!   any         --fail(msg)-----------> FAILED ("Error: " + msg)

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::task_log::{SearchResult, TaskLog};
use crate::domain::DomainError;

const EMPTY_RESULT_MARKER: &str = "task produced an empty result";

/// Which agent owns a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    WebSearch,
    GeneralAnswer,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::WebSearch => "web_search",
            AgentKind::GeneralAnswer => "general_answer",
        }
    }

    /// Parse an agent label (planner output, DB column). Unknown labels
    /// are a domain error, not a parse error: the planner schema constrains
    /// the label set and anything else means the provider broke contract.
    pub fn parse(s: &str) -> Result<AgentKind, DomainError> {
        match s {
            "web_search" => Ok(AgentKind::WebSearch),
            "general_answer" => Ok(AgentKind::GeneralAnswer),
            other => Err(DomainError::UnknownAgent(other.to_string())),
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work with its own attempt log. The log kind always matches
/// the agent kind; the constructors pair them and `reconstruct` re-checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: Uuid,
    description: String,
    agent: AgentKind,
    status: TaskStatus,
    result: Option<String>,
    log: TaskLog,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Task {
    fn new(description: &str, agent: AgentKind, log: TaskLog) -> Result<Self, DomainError> {
        if description.trim().is_empty() {
            return Err(DomainError::EmptyTaskDescription);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            description: description.to_string(),
            agent,
            status: TaskStatus::InProgress,
            result: None,
            log,
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    pub fn web_search(description: &str) -> Result<Self, DomainError> {
        Self::new(description, AgentKind::WebSearch, TaskLog::web_search())
    }

    pub fn general_answer(description: &str) -> Result<Self, DomainError> {
        Self::new(description, AgentKind::GeneralAnswer, TaskLog::general_answer())
    }

    /// Rebuild a persisted task. The log kind must match the agent kind.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: Uuid,
        description: &str,
        agent: AgentKind,
        status: TaskStatus,
        result: Option<String>,
        log: TaskLog,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, DomainError> {
        if description.trim().is_empty() {
            return Err(DomainError::EmptyTaskDescription);
        }
        if log.kind() != agent {
            return Err(DomainError::TaskLogKindMismatch(agent));
        }
        Ok(Self {
            id,
            description: description.to_string(),
            agent,
            status,
            result,
            log,
            created_at,
            completed_at,
        })
    }

    /// Complete with a result. Legal only from IN_PROGRESS; an empty result
    /// fails the task instead of completing it.
    pub fn complete(&mut self, result: &str) -> Result<(), DomainError> {
        if self.status != TaskStatus::InProgress {
            return Err(DomainError::TaskNotInProgress(self.status));
        }
        if result.trim().is_empty() {
            self.fail(EMPTY_RESULT_MARKER);
            return Ok(());
        }
        self.status = TaskStatus::Completed;
        self.result = Some(result.to_string());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Replace the result of an already-completed task (regeneration retry).
    /// Legal only from COMPLETED; an empty replacement fails the task.
    pub fn update_result(&mut self, result: &str) -> Result<(), DomainError> {
        if self.status != TaskStatus::Completed {
            return Err(DomainError::TaskNotCompleted(self.status));
        }
        if result.trim().is_empty() {
            self.fail(EMPTY_RESULT_MARKER);
            return Ok(());
        }
        self.result = Some(result.to_string());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the task failed. Legal from any status.
    pub fn fail(&mut self, error_message: &str) {
        self.status = TaskStatus::Failed;
        self.result = Some(format!("Error: {}", error_message));
        self.completed_at = Some(Utc::now());
    }

    /// Record a search attempt on the task's log. Fails on a general-answer task.
    pub fn record_search_attempt(
        &mut self,
        query: &str,
        results: Vec<SearchResult>,
    ) -> Result<(), DomainError> {
        self.log.add_search_attempt(query, results)
    }

    /// Record a generation attempt on the task's log. Fails on a web-search task.
    pub fn record_generation_attempt(&mut self, response: &str) -> Result<(), DomainError> {
        self.log.add_generation_attempt(response)
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn agent(&self) -> AgentKind {
        self.agent
    }

    #[inline]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    #[inline]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    #[inline]
    pub fn log(&self) -> &TaskLog {
        &self.log
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

/// Retry target distinguished by the evaluator: bad evidence (re-search) vs
/// bad synthesis over good evidence (re-generate only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTarget {
    Search,
    Generate,
}

impl RetryTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryTarget::Search => "search",
            RetryTarget::Generate => "generate",
        }
    }

    pub fn parse(s: &str) -> Option<RetryTarget> {
        match s {
            "search" => Some(RetryTarget::Search),
            "generate" => Some(RetryTarget::Generate),
            _ => None,
        }
    }
}

/// The evaluator's judgement on a task result. `is_satisfactory` is true
/// iff no retry target is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvaluation {
    is_satisfactory: bool,
    need: Option<RetryTarget>,
    reason: String,
    feedback: Option<String>,
}

impl TaskEvaluation {
    pub fn satisfactory(reason: &str) -> Self {
        Self {
            is_satisfactory: true,
            need: None,
            reason: reason.to_string(),
            feedback: None,
        }
    }

    pub fn needs(need: RetryTarget, reason: &str, feedback: Option<&str>) -> Self {
        Self {
            is_satisfactory: false,
            need: Some(need),
            reason: reason.to_string(),
            feedback: feedback.map(str::to_string),
        }
    }

    /// Unsatisfactory but with no actionable retry target.
    pub fn unsalvageable(reason: &str) -> Self {
        Self {
            is_satisfactory: false,
            need: None,
            reason: reason.to_string(),
            feedback: None,
        }
    }

    #[inline]
    pub fn is_satisfactory(&self) -> bool {
        self.is_satisfactory
    }

    #[inline]
    pub fn need(&self) -> Option<RetryTarget> {
        self.need
    }

    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    #[inline]
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }
}
