//! Answer a task from trained knowledge, with the session history as context.

use std::sync::Arc;

use crate::domain::{ChatSession, Message, Task};
use crate::llm::LlmPort;
use crate::services::{current_date, ServiceError};

const SYSTEM_PROMPT: &str = "\
## Your role:
You are a workspace assistant answering questions and requests from team
members. Be helpful and accurate.

## Answer style:

- **Natural conversation**: keep the tone friendly, not stiff
- **Brevity**: answer the question directly with just enough information
- **Clarity**: briefly explain any technical terms you use

## Constraints:
- Answer from trained knowledge only
- When the answer would need current information, or you are unsure, say so \
plainly instead of guessing
- Do not introduce yourself in the answer";

/// Runs a general-answer task: one generation, recorded and completed.
#[derive(Clone)]
pub struct GeneralAnswerService {
    llm: Arc<dyn LlmPort>,
}

impl GeneralAnswerService {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    pub async fn execute(
        &self,
        session: &ChatSession,
        task: &mut Task,
    ) -> Result<(), ServiceError> {
        let task_prompt = build_task_prompt(task.description());

        let mut messages = vec![Message::system(SYSTEM_PROMPT)?];
        messages.extend(session.messages().iter().cloned());
        messages.push(Message::user(&task_prompt)?);

        let answer = self.llm.generate(&messages).await?;

        // An empty response is not a recordable attempt; `complete` turns it
        // into a failed task.
        if !answer.trim().is_empty() {
            task.record_generation_attempt(&answer)?;
        }
        task.complete(&answer)?;
        Ok(())
    }
}

fn build_task_prompt(task_description: &str) -> String {
    format!(
        "## Current date:\n{}\n\n## Task:\n{}\n\nAnswer the task above.",
        current_date(),
        task_description,
    )
}
