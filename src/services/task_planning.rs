//! Split the latest user request into independent sub-tasks, each assigned
//! to one agent kind.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{AgentKind, ChatSession, DomainError, Message, Task, TaskPlan};
use crate::llm::{LlmError, LlmPort, StructuredSchema};
use crate::services::ServiceError;

const SYSTEM_PROMPT: &str = "\
Split the user's request into independently executable sub-tasks.

# System architecture:
1. **Task planning (your role)**: split the request into tasks and assign each to an agent
2. **Task execution**: the agents run in parallel and return their results
3. **Answer generation**: all results are merged into one final answer

**Important**: tasks run in parallel.

# Available agents

- **general_answer**: answers from trained knowledge; no external lookup
- **web_search**: runs web searches and reads the result pages; best for news, \
current facts, and anything on the public web

# Task rules

1. **Create at least one task**
2. **Every task must be fully independent** - no task may depend on another's output
3. **Describe each task concretely** - the description is the agent's instruction";

#[derive(Deserialize)]
struct PlannedTask {
    task_description: String,
    next_agent: String,
}

#[derive(Deserialize)]
struct PlanOutput {
    tasks: Vec<PlannedTask>,
    #[allow(dead_code)]
    reason: String,
}

fn plan_schema() -> StructuredSchema {
    StructuredSchema {
        name: "task_plan",
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "task_description": { "type": "string" },
                            "next_agent": { "type": "string", "enum": ["general_answer", "web_search"] }
                        },
                        "required": ["task_description", "next_agent"]
                    }
                },
                "reason": { "type": "string" }
            },
            "required": ["tasks", "reason"]
        }),
    }
}

/// Produces a `TaskPlan` for the session's latest user message.
#[derive(Clone)]
pub struct TaskPlanningService {
    llm: Arc<dyn LlmPort>,
}

impl TaskPlanningService {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    pub async fn execute(&self, session: &ChatSession) -> Result<TaskPlan, ServiceError> {
        let latest = session.last_user_message()?;
        let latest_id = latest.id();
        let focus = format!(
            "Plan only for the latest request: {}",
            latest.content()
        );

        let mut messages = vec![Message::system(SYSTEM_PROMPT)?];
        messages.extend(session.messages().iter().cloned());
        messages.push(Message::system(&focus)?);

        let value = self
            .llm
            .generate_structured(&messages, &plan_schema())
            .await?;
        let plan: PlanOutput = serde_json::from_value(value)
            .map_err(|e| ServiceError::Llm(LlmError::Parse(e.to_string())))?;

        if plan.tasks.is_empty() {
            return Err(DomainError::EmptyTaskList.into());
        }

        let mut tasks = Vec::with_capacity(plan.tasks.len());
        for planned in &plan.tasks {
            let task = match AgentKind::parse(&planned.next_agent)? {
                AgentKind::WebSearch => Task::web_search(&planned.task_description)?,
                AgentKind::GeneralAnswer => Task::general_answer(&planned.task_description)?,
            };
            tasks.push(task);
        }

        Ok(TaskPlan::new(latest_id, tasks)?)
    }
}
