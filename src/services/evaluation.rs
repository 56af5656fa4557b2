//! Judge a task result: satisfactory, or in need of a re-search or a
//! re-generation.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{DomainError, Message, RetryTarget, SearchResult, Task, TaskEvaluation};
use crate::llm::{LlmError, LlmPort, StructuredSchema};
use crate::services::{current_date, ServiceError};

const SYSTEM_PROMPT: &str = "\
You are an expert at judging task result quality.

## Evaluation steps:

### 1. Check the search results
**need = \"search\" (the search needs improving):**
- The search results do not contain the information the task asks for
- The queries were off target

### 2. Check the task result
**need = \"generate\" (the write-up needs improving):**
- Key information from the search results was not used
- The structure or wording is hard to follow

### 3. Overall satisfaction
**need = null (no improvement needed):**
- The key information is reflected accurately
- The text reads naturally

## Important:
- is_satisfactory is true only when need is null
- feedback must be concrete and actionable";

#[derive(Deserialize)]
struct EvaluationOutput {
    is_satisfactory: bool,
    need: Option<String>,
    reason: String,
    feedback: Option<String>,
}

fn evaluation_schema() -> StructuredSchema {
    StructuredSchema {
        name: "task_evaluation",
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "is_satisfactory": { "type": "boolean" },
                "need": { "type": ["string", "null"], "enum": ["search", "generate", null] },
                "reason": { "type": "string" },
                "feedback": { "type": ["string", "null"] }
            },
            "required": ["is_satisfactory", "need", "reason", "feedback"]
        }),
    }
}

/// Evaluates a task's result against its evidence.
#[derive(Clone)]
pub struct TaskResultEvaluationService {
    llm: Arc<dyn LlmPort>,
}

impl TaskResultEvaluationService {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    pub async fn execute(&self, task: &Task) -> Result<TaskEvaluation, ServiceError> {
        let result = task.result().ok_or(DomainError::TaskResultNotFound)?;
        let prompt = build_prompt(task.description(), result, &task.log().search_results());

        let messages = vec![Message::system(SYSTEM_PROMPT)?, Message::user(&prompt)?];
        let value = self
            .llm
            .generate_structured(&messages, &evaluation_schema())
            .await?;
        let out: EvaluationOutput = serde_json::from_value(value)
            .map_err(|e| ServiceError::Llm(LlmError::Parse(e.to_string())))?;

        let need = match out.need.as_deref() {
            None => None,
            Some(label) => Some(RetryTarget::parse(label).ok_or_else(|| {
                ServiceError::Llm(LlmError::Parse(format!(
                    "schema violation: unknown retry target '{}'",
                    label
                )))
            })?),
        };

        // Normalise to the value-object contract: satisfied iff no need.
        Ok(if out.is_satisfactory {
            TaskEvaluation::satisfactory(&out.reason)
        } else {
            match need {
                Some(target) => {
                    TaskEvaluation::needs(target, &out.reason, out.feedback.as_deref())
                }
                None => TaskEvaluation::unsalvageable(&out.reason),
            }
        })
    }
}

fn build_prompt(task_description: &str, task_result: &str, search_results: &[&SearchResult]) -> String {
    let mut prompt = format!(
        "## Current date:\n{}\n\n## Assigned task:\n{}\n\n## Generated task result:\n{}",
        current_date(),
        task_description,
        task_result,
    );

    if !search_results.is_empty() {
        prompt.push_str("\n\n## Search results used:");
        for (i, result) in search_results.iter().enumerate() {
            prompt.push_str(&format!(
                "\n\n### Result {}\n**URL**: {}\n**Title**: {}",
                i + 1,
                result.url,
                result.title,
            ));
        }
    }

    prompt
}
