//! General-answer agent: a single EXECUTE step, no retries.

use crate::domain::{ChatSession, Task};
use crate::services::GeneralAnswerService;
use crate::workflow::WorkflowError;

/// Wraps [`GeneralAnswerService`] as a one-step agent. The agent terminates
/// with the task COMPLETED or FAILED; a provider error propagates to the
/// supervisor.
#[derive(Clone)]
pub struct GeneralAnswerAgent {
    service: GeneralAnswerService,
}

impl GeneralAnswerAgent {
    pub fn new(service: GeneralAnswerService) -> Self {
        Self { service }
    }

    pub async fn run(&self, session: &ChatSession, mut task: Task) -> Result<Task, WorkflowError> {
        self.service.execute(session, &mut task).await?;
        Ok(task)
    }
}
