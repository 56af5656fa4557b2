//! Synthesise a task result from the search evidence accumulated on the task.

use std::sync::Arc;

use crate::domain::{Message, SearchResult, Task, TaskStatus};
use crate::llm::LlmPort;
use crate::services::{current_date, ServiceError};

const SYSTEM_PROMPT: &str = "\
You are a task execution agent. Summarise the result of the assigned task
from the search results below.

## System architecture:
1. **Task planning**: the user's question was split into tasks
2. **Task execution (your role)**: run searches per task and summarise the findings
3. **Answer generation**: all task results are merged into the final answer

**Important**: the answer-generation agent cannot see the search results.

## Result rules:

1. **Use only the search results**:
    - Use only information present in the search results
    - Never guess

2. **Write for the next agent**:
    - Include concrete figures, dates, and proper nouns
    - Briefly gloss technical terms

3. **Cite sources (required)**:
    - Citation markers: [0], [1] in square brackets
    - Link format: `<URL|title>`
    - **Copy URLs exactly, character for character - never invent or edit them**

4. **Format**:
    ```
    (task result body)[0][1]

    [References] (2)
    [0] <URL|title>
    [1] <URL|title>
    ```";

/// Turns the task's accumulated search evidence into a result, completing
/// the task (or replacing its result on a regeneration retry).
#[derive(Clone)]
pub struct TaskResultGenerationService {
    llm: Arc<dyn LlmPort>,
}

impl TaskResultGenerationService {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    pub async fn execute(
        &self,
        task: &mut Task,
        feedback: Option<&str>,
        previous_result: Option<&str>,
    ) -> Result<(), ServiceError> {
        let prompt = build_prompt(
            task.description(),
            &task.log().search_results(),
            feedback,
            previous_result,
        );

        let messages = vec![Message::system(SYSTEM_PROMPT)?, Message::user(&prompt)?];
        let result = self.llm.generate(&messages).await?;

        // First pass completes; a retry replaces the existing result. Empty
        // output fails the task inside either transition.
        match task.status() {
            TaskStatus::Completed => task.update_result(&result)?,
            _ => task.complete(&result)?,
        }
        Ok(())
    }
}

fn build_prompt(
    task_description: &str,
    search_results: &[&SearchResult],
    feedback: Option<&str>,
    previous_result: Option<&str>,
) -> String {
    let mut prompt = format!(
        "## Current date:\n{}\n\n## Assigned task:\n{}",
        current_date(),
        task_description,
    );

    if !search_results.is_empty() {
        prompt.push_str("\n\n## Search results:");
        for (i, result) in search_results.iter().enumerate() {
            prompt.push_str(&format!(
                "\n\n### Result {}\n**Title**: {}\n**URL**: {}\n**Content**:\n{}",
                i + 1,
                result.title,
                result.url,
                result.content,
            ));
        }
        prompt.push_str(
            "\n\n**Important: when citing a URL under [References], copy it exactly.**",
        );
    }

    if let Some(feedback) = feedback {
        prompt.push_str("\n\n## Improvement feedback:\n");
        prompt.push_str(feedback);
        if let Some(previous) = previous_result {
            prompt.push_str("\n\n## Previous task result:\n");
            prompt.push_str(previous);
        }
        prompt.push_str(
            "\n\n**Important**: use the feedback to produce a better task result.",
        );
    }

    prompt
}
