//! Workflow supervisor: plan -> fan-out to task agents -> fan-in -> final answer.
//!
//! One `Workflow` is built at startup and shared across turns. Each
//! invocation plans tasks for the session's latest user message, runs one
//! agent per task concurrently (`tokio::spawn` via `JoinSet`, each agent
//! owning its task), reassembles the plan in order, and synthesises the
//! final answer. A process-wide counting semaphore bounds concurrent
//! invocations; excess turns wait.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::domain::{AgentKind, ChatSession, DomainError, Task, TaskPlan};
use crate::llm::LlmPort;
use crate::search::{SearchError, SearchPort};
use crate::services::{
    FinalAnswerService, GeneralAnswerService, SearchQueryGenerationService, ServiceError,
    TaskPlanningService, TaskResultEvaluationService, TaskResultGenerationService,
};
use crate::workflow::general_answer::GeneralAnswerAgent;
use crate::workflow::web_search::WebSearchAgent;

pub mod general_answer;
pub mod web_search;

/// Default process-wide cap on concurrent workflow invocations.
pub const MAX_CONCURRENT_WORKFLOWS: usize = 60;

/// Routing metadata carried alongside a turn (derived by the chat adapter).
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub conversation_id: String,
    pub thread_ts: Option<String>,
    pub user_id: Option<String>,
    pub channel_id: Option<String>,
}

/// The workflow's output for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    pub answer: String,
    pub task_plan: TaskPlan,
}

#[derive(Debug)]
pub enum WorkflowError {
    Service(ServiceError),
    Search(SearchError),
    Runtime(String),
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowError::Service(e) => write!(f, "workflow service: {}", e),
            WorkflowError::Search(e) => write!(f, "workflow search: {}", e),
            WorkflowError::Runtime(s) => write!(f, "workflow runtime: {}", s),
        }
    }
}

impl std::error::Error for WorkflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkflowError::Service(e) => Some(e),
            WorkflowError::Search(e) => Some(e),
            WorkflowError::Runtime(_) => None,
        }
    }
}

impl From<ServiceError> for WorkflowError {
    fn from(e: ServiceError) -> Self {
        WorkflowError::Service(e)
    }
}

impl From<SearchError> for WorkflowError {
    fn from(e: SearchError) -> Self {
        WorkflowError::Search(e)
    }
}

impl From<DomainError> for WorkflowError {
    fn from(e: DomainError) -> Self {
        WorkflowError::Service(ServiceError::Domain(e))
    }
}

/// Supervisor over the planning service, the two task agents, and the
/// final-answer service.
pub struct Workflow {
    planning: TaskPlanningService,
    general_answer: GeneralAnswerAgent,
    web_search: WebSearchAgent,
    final_answer: FinalAnswerService,
    limiter: Arc<Semaphore>,
}

impl Workflow {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        search: Arc<dyn SearchPort>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            planning: TaskPlanningService::new(Arc::clone(&llm)),
            general_answer: GeneralAnswerAgent::new(GeneralAnswerService::new(Arc::clone(&llm))),
            web_search: WebSearchAgent::new(
                SearchQueryGenerationService::new(Arc::clone(&llm)),
                TaskResultGenerationService::new(Arc::clone(&llm)),
                TaskResultEvaluationService::new(Arc::clone(&llm)),
                search,
            ),
            final_answer: FinalAnswerService::new(llm),
            limiter: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    /// Run one turn. The session is read-only here: the caller appends the
    /// answer and the returned plan itself, exactly once, before saving.
    pub async fn execute(
        &self,
        session: &ChatSession,
        context: &RequestContext,
    ) -> Result<WorkflowResult, WorkflowError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| WorkflowError::Runtime(format!("admission semaphore: {}", e)))?;

        eprintln!("workflow: planning conversation={}", context.conversation_id);
        let plan = self.planning.execute(session).await?;
        let (plan_id, message_id, tasks) = plan.into_parts();
        let task_count = tasks.len();

        // Fan out: each agent owns its task; the session is shared read-only.
        let session = Arc::new(session.clone());
        let mut join_set = JoinSet::new();
        for (idx, task) in tasks.into_iter().enumerate() {
            match task.agent() {
                AgentKind::GeneralAnswer => {
                    let agent = self.general_answer.clone();
                    let session = Arc::clone(&session);
                    join_set.spawn(async move { (idx, agent.run(&session, task).await) });
                }
                AgentKind::WebSearch => {
                    let agent = self.web_search.clone();
                    join_set.spawn(async move { (idx, agent.run(task).await) });
                }
            }
        }

        // Fan in: keep plan order by index. Any agent error fails the turn
        // (remaining branches are aborted when the JoinSet drops); a FAILED
        // task is not an error.
        let mut finished: Vec<Option<Task>> = (0..task_count).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (idx, result) = joined.map_err(|e| WorkflowError::Runtime(e.to_string()))?;
            finished[idx] = Some(result?);
        }
        let tasks = finished
            .into_iter()
            .collect::<Option<Vec<Task>>>()
            .ok_or_else(|| WorkflowError::Runtime("fan-out branch returned no task".into()))?;

        let task_plan = TaskPlan::reconstruct(plan_id, message_id, tasks)?;
        let message = self.final_answer.execute(&session, &task_plan).await?;

        Ok(WorkflowResult {
            answer: message.content().to_string(),
            task_plan,
        })
    }
}
