//! Use cases: thin coordinators over the workflow and the repositories.

pub mod answer_request;
pub mod feedback;

pub use answer_request::{AnswerRequestInput, AnswerRequestOutput, AnswerToUserRequestUseCase};
pub use feedback::{FeedbackInput, FeedbackUseCase};

use crate::domain::DomainError;
use crate::repository::RepositoryError;
use crate::workflow::WorkflowError;

#[derive(Debug)]
pub enum UseCaseError {
    /// Missing or empty caller input; names the offending field.
    InvalidInput(&'static str),
    Domain(DomainError),
    Workflow(WorkflowError),
    Repository(RepositoryError),
}

impl std::fmt::Display for UseCaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UseCaseError::InvalidInput(field) => write!(f, "invalid input: {}", field),
            UseCaseError::Domain(e) => write!(f, "usecase domain: {}", e),
            UseCaseError::Workflow(e) => write!(f, "usecase workflow: {}", e),
            UseCaseError::Repository(e) => write!(f, "usecase repository: {}", e),
        }
    }
}

impl std::error::Error for UseCaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UseCaseError::InvalidInput(_) => None,
            UseCaseError::Domain(e) => Some(e),
            UseCaseError::Workflow(e) => Some(e),
            UseCaseError::Repository(e) => Some(e),
        }
    }
}

impl From<DomainError> for UseCaseError {
    fn from(e: DomainError) -> Self {
        UseCaseError::Domain(e)
    }
}

impl From<WorkflowError> for UseCaseError {
    fn from(e: WorkflowError) -> Self {
        UseCaseError::Workflow(e)
    }
}

impl From<RepositoryError> for UseCaseError {
    fn from(e: RepositoryError) -> Self {
        UseCaseError::Repository(e)
    }
}
