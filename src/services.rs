//! Stateless prompted operations over the LLM and search ports.
//!
//! Every service builds `[SYSTEM prompt, …history?, USER prompt]`, with the
//! current date templated into the user prompt, and applies the response to
//! the domain (or returns a value object).

pub mod evaluation;
pub mod final_answer;
pub mod general_answer;
pub mod search_query;
pub mod task_planning;
pub mod task_result;

pub use evaluation::TaskResultEvaluationService;
pub use final_answer::FinalAnswerService;
pub use general_answer::GeneralAnswerService;
pub use search_query::SearchQueryGenerationService;
pub use task_planning::TaskPlanningService;
pub use task_result::TaskResultGenerationService;

use crate::domain::DomainError;
use crate::llm::LlmError;

/// Service-layer errors: either the provider failed or a domain rule did.
#[derive(Debug)]
pub enum ServiceError {
    Llm(LlmError),
    Domain(DomainError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Llm(e) => write!(f, "service llm: {}", e),
            ServiceError::Domain(e) => write!(f, "service domain: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Llm(e) => Some(e),
            ServiceError::Domain(e) => Some(e),
        }
    }
}

impl From<LlmError> for ServiceError {
    fn from(e: LlmError) -> Self {
        ServiceError::Llm(e)
    }
}

impl From<DomainError> for ServiceError {
    fn from(e: DomainError) -> Self {
        ServiceError::Domain(e)
    }
}

/// Today's date for prompt templating.
pub(crate) fn current_date() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
