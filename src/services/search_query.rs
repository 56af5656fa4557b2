//! Generate search queries for a web-search task, diversifying away from
//! queries already tried and folding in evaluator feedback.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{Message, Task};
use crate::llm::{LlmError, LlmPort, StructuredSchema};
use crate::services::{current_date, ServiceError};

pub const MAX_QUERIES: usize = 3;

const SYSTEM_PROMPT: &str = "\
You are an expert at writing search queries. Generate the queries best
suited to answering the assigned task.

## Query rules:

1. **Search from several angles**:
    - Generate 2-3 queries that gather information from different directions
    - Avoid queries that overlap

2. **Be specific**:
    - Avoid vague wording; use proper nouns

3. **Mind the time frame**:
    - If the task says \"today\", include the date
    - If current information is needed, include \"latest\" or the year

4. **Use the task text**:
    - Replace pronouns with the concrete nouns they refer to
    - Fill in details the task implies

## Important:
- Generate at least 2 queries
- Approach the search from a different angle than any previous queries";

#[derive(Deserialize)]
struct QueriesOutput {
    queries: Vec<String>,
    #[allow(dead_code)]
    reason: String,
}

fn queries_schema() -> StructuredSchema {
    StructuredSchema {
        name: "search_queries",
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "maxItems": MAX_QUERIES,
                    "items": { "type": "string" }
                },
                "reason": { "type": "string" }
            },
            "required": ["queries", "reason"]
        }),
    }
}

/// Produces up to [`MAX_QUERIES`] search queries for a task.
#[derive(Clone)]
pub struct SearchQueryGenerationService {
    llm: Arc<dyn LlmPort>,
}

impl SearchQueryGenerationService {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    pub async fn execute(
        &self,
        task: &Task,
        feedback: Option<&str>,
    ) -> Result<Vec<String>, ServiceError> {
        let previous_queries = task.log().queries();
        let prompt = build_prompt(task.description(), &previous_queries, feedback);

        let messages = vec![Message::system(SYSTEM_PROMPT)?, Message::user(&prompt)?];
        let value = self
            .llm
            .generate_structured(&messages, &queries_schema())
            .await?;
        let out: QueriesOutput = serde_json::from_value(value)
            .map_err(|e| ServiceError::Llm(LlmError::Parse(e.to_string())))?;

        if out.queries.len() > MAX_QUERIES {
            return Err(ServiceError::Llm(LlmError::Parse(format!(
                "schema violation: {} queries (max {})",
                out.queries.len(),
                MAX_QUERIES
            ))));
        }
        Ok(out.queries)
    }
}

fn build_prompt(task_description: &str, previous_queries: &[&str], feedback: Option<&str>) -> String {
    let mut prompt = format!(
        "## Current date:\n{}\n\n## Assigned task:\n{}",
        current_date(),
        task_description,
    );

    if !previous_queries.is_empty() {
        prompt.push_str("\n\n## Queries already used:\n");
        for q in previous_queries {
            prompt.push_str("- ");
            prompt.push_str(q);
            prompt.push('\n');
        }
        prompt.push_str(
            "\n**Important**: the previous search did not return enough, so \
             generate new queries from a different angle.",
        );
    }

    if let Some(feedback) = feedback {
        prompt.push_str("\n\n## Improvement feedback:\n");
        prompt.push_str(feedback);
        prompt.push_str("\n\nTake the feedback above into account.");
    }

    prompt
}
