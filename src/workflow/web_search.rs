//! Web-search agent: generate queries -> search -> generate result ->
//! evaluate, with a bounded retry loop.
//!
//! The evaluator distinguishes the two failure modes: bad evidence routes
//! back to query generation (a fresh search attempt), bad synthesis over
//! good evidence routes back to result generation only, keeping the
//! accumulated search results. At most [`MAX_ATTEMPTS`] attempts per task.

use std::sync::Arc;

use crate::domain::{RetryTarget, Task, TaskStatus};
use crate::search::SearchPort;
use crate::services::{
    SearchQueryGenerationService, TaskResultEvaluationService, TaskResultGenerationService,
};
use crate::workflow::WorkflowError;

/// Upper bound on attempts (initial pass + retries) per task.
pub const MAX_ATTEMPTS: u32 = 2;
/// Results requested per query.
const RESULTS_PER_QUERY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    GenQueries,
    Search,
    GenResult,
    Eval,
    End,
}

/// Per-task sub-state-machine around the three web-search services.
#[derive(Clone)]
pub struct WebSearchAgent {
    query_gen: SearchQueryGenerationService,
    result_gen: TaskResultGenerationService,
    evaluation: TaskResultEvaluationService,
    search: Arc<dyn SearchPort>,
}

impl WebSearchAgent {
    pub fn new(
        query_gen: SearchQueryGenerationService,
        result_gen: TaskResultGenerationService,
        evaluation: TaskResultEvaluationService,
        search: Arc<dyn SearchPort>,
    ) -> Self {
        Self {
            query_gen,
            result_gen,
            evaluation,
            search,
        }
    }

    pub async fn run(&self, mut task: Task) -> Result<Task, WorkflowError> {
        let mut attempt: u32 = 0;
        let mut feedback: Option<String> = None;
        let mut queries: Vec<String> = Vec::new();
        let mut step = Step::GenQueries;

        loop {
            step = match step {
                Step::GenQueries => {
                    queries = self.query_gen.execute(&task, feedback.as_deref()).await?;
                    Step::Search
                }
                Step::Search => {
                    // Every query becomes a recorded attempt; empty results
                    // are valid. Per-URL fetch failures were already degraded
                    // to snippets inside the port; a query-level error fails
                    // the agent.
                    for query in &queries {
                        let results = self.search.search(query, RESULTS_PER_QUERY).await?;
                        task.record_search_attempt(query, results)?;
                    }
                    Step::GenResult
                }
                Step::GenResult => {
                    let previous = if attempt > 0 {
                        task.result().map(str::to_string)
                    } else {
                        None
                    };
                    self.result_gen
                        .execute(&mut task, feedback.as_deref(), previous.as_deref())
                        .await?;
                    if task.status() == TaskStatus::Failed {
                        Step::End
                    } else {
                        Step::Eval
                    }
                }
                Step::Eval => {
                    let evaluation = self.evaluation.execute(&task).await?;
                    if evaluation.is_satisfactory() || attempt + 1 >= MAX_ATTEMPTS {
                        Step::End
                    } else {
                        match evaluation.need() {
                            Some(RetryTarget::Search) => {
                                attempt += 1;
                                feedback = evaluation.feedback().map(str::to_string);
                                Step::GenQueries
                            }
                            Some(RetryTarget::Generate) => {
                                attempt += 1;
                                feedback = evaluation.feedback().map(str::to_string);
                                Step::GenResult
                            }
                            None => Step::End,
                        }
                    }
                }
                Step::End => return Ok(task),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchResult;
    use crate::llm::LlmPort;
    use crate::services::test_support::{ScriptedLlm, ScriptedSearch};

    fn agent(llm: Arc<ScriptedLlm>, search: Arc<ScriptedSearch>) -> WebSearchAgent {
        let llm: Arc<dyn LlmPort> = llm;
        WebSearchAgent::new(
            SearchQueryGenerationService::new(Arc::clone(&llm)),
            TaskResultGenerationService::new(Arc::clone(&llm)),
            TaskResultEvaluationService::new(llm),
            search,
        )
    }

    fn hit() -> SearchResult {
        SearchResult {
            url: "https://python.org".to_string(),
            title: "Python".to_string(),
            content: "Python 3.13".to_string(),
        }
    }

    fn queries_json(queries: &[&str]) -> serde_json::Value {
        serde_json::json!({ "queries": queries, "reason": "r" })
    }

    fn eval_json(satisfactory: bool, need: Option<&str>, feedback: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "is_satisfactory": satisfactory,
            "need": need,
            "reason": "r",
            "feedback": feedback
        })
    }

    #[tokio::test]
    async fn satisfied_first_attempt_runs_each_step_once() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_value(queries_json(&["python latest version"]));
        llm.push_text("Python 3.13 released[0]");
        llm.push_value(eval_json(true, None, None));
        let search = Arc::new(ScriptedSearch::new());
        search.push_results(vec![hit()]);

        let task = Task::web_search("latest Python version").unwrap();
        let task = agent(llm.clone(), search.clone())
            .run(task)
            .await
            .unwrap();

        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.result(), Some("Python 3.13 released[0]"));
        assert_eq!(task.log().search_attempts().len(), 1);
        assert_eq!(llm.call_count(), 3); // queries + result + eval
        assert_eq!(search.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn retry_via_search_reruns_query_generation() {
        let llm = Arc::new(ScriptedLlm::new());
        // attempt 0
        llm.push_value(queries_json(&["python version"]));
        llm.push_text("vague result");
        llm.push_value(eval_json(false, Some("search"), Some("use year")));
        // attempt 1
        llm.push_value(queries_json(&["python version 2026"]));
        llm.push_text("Python 3.13 released[0]");
        llm.push_value(eval_json(true, None, None));

        let search = Arc::new(ScriptedSearch::new());
        search.push_results(vec![]);
        search.push_results(vec![hit()]);

        let task = Task::web_search("latest Python version").unwrap();
        let task = agent(llm.clone(), search.clone())
            .run(task)
            .await
            .unwrap();

        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.log().search_attempts().len(), 2);
        assert_eq!(llm.call_count(), 6);

        // The second query-generation call carried the evaluator feedback and
        // the already-used query list.
        let calls = llm.calls.lock().unwrap();
        let second_query_call = &calls[3];
        assert_eq!(second_query_call.schema, Some("search_queries"));
        let prompt = second_query_call.messages[1].content();
        assert!(prompt.contains("use year"));
        assert!(prompt.contains("- python version"));
    }

    #[tokio::test]
    async fn retry_via_generate_keeps_search_results() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_value(queries_json(&["python version"]));
        llm.push_text("first result");
        llm.push_value(eval_json(false, Some("generate"), Some("cite URL")));
        llm.push_text("second result with <https://python.org|Python>[0]");
        llm.push_value(eval_json(true, None, None));

        let search = Arc::new(ScriptedSearch::new());
        search.push_results(vec![hit()]);

        let task = Task::web_search("latest Python version").unwrap();
        let task = agent(llm.clone(), search.clone())
            .run(task)
            .await
            .unwrap();

        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(
            task.result(),
            Some("second result with <https://python.org|Python>[0]")
        );
        // Search ran once: retry targeted generation only.
        assert_eq!(task.log().search_attempts().len(), 1);
        assert_eq!(search.queries.lock().unwrap().len(), 1);

        // The regeneration prompt carried feedback and the previous result.
        let calls = llm.calls.lock().unwrap();
        let regen = &calls[3];
        assert_eq!(regen.schema, None);
        let prompt = regen.messages[1].content();
        assert!(prompt.contains("cite URL"));
        assert!(prompt.contains("## Previous task result:\nfirst result"));
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let llm = Arc::new(ScriptedLlm::new());
        // attempt 0
        llm.push_value(queries_json(&["q1"]));
        llm.push_text("r1");
        llm.push_value(eval_json(false, Some("search"), None));
        // attempt 1: eval unsatisfied again, but the bound ends the loop
        llm.push_value(queries_json(&["q2"]));
        llm.push_text("r2");
        llm.push_value(eval_json(false, Some("search"), None));

        let search = Arc::new(ScriptedSearch::new());
        search.push_results(vec![]);
        search.push_results(vec![]);

        let task = Task::web_search("t").unwrap();
        let task = agent(llm.clone(), search.clone())
            .run(task)
            .await
            .unwrap();

        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.result(), Some("r2"));
        // 2 query generations, 2 result generations, 2 evaluations; no more.
        assert_eq!(llm.call_count(), 6);
    }

    #[tokio::test]
    async fn unsatisfied_without_target_ends() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_value(queries_json(&["q"]));
        llm.push_text("r");
        llm.push_value(eval_json(false, None, None));

        let search = Arc::new(ScriptedSearch::new());
        search.push_results(vec![]);

        let task = Task::web_search("t").unwrap();
        let task = agent(llm.clone(), search).run(task).await.unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_generation_fails_task_without_evaluation() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_value(queries_json(&["q"]));
        llm.push_text(""); // result generation returns nothing

        let search = Arc::new(ScriptedSearch::new());
        search.push_results(vec![]);

        let task = Task::web_search("t").unwrap();
        let task = agent(llm.clone(), search).run(task).await.unwrap();
        assert_eq!(task.status(), TaskStatus::Failed);
        // No evaluation call was made on the failed task.
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_query_list_still_generates_a_result() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_value(queries_json(&[]));
        llm.push_text("answered from nothing");
        llm.push_value(eval_json(true, None, None));

        let search = Arc::new(ScriptedSearch::new());

        let task = Task::web_search("t").unwrap();
        let task = agent(llm.clone(), search.clone()).run(task).await.unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(search.queries.lock().unwrap().is_empty());
        assert!(task.log().search_attempts().is_empty());
    }
}
