//! Merge completed task results into the final answer for the user.

use std::sync::Arc;

use crate::domain::{ChatSession, Message, TaskPlan};
use crate::llm::LlmPort;
use crate::services::{current_date, ServiceError};

const SYSTEM_PROMPT: &str = "\
Merge the results of the executed tasks into one comprehensive, clear answer
to the user's question.

# Answer rules:

1. **Integration and consistency**:
    - Weave the task results into natural prose, not a list of fragments
    - If results contradict each other, present both and point out the difference

2. **Brevity with the right amount of information**:
    - Answer the question directly, within its scope
    - Keep headings minimal

3. **Clarity**:
    - Plain, concise language
    - Keep bullet lists to 3-5 items

4. **Citations (required)**:
    - **Never invent or edit a URL or file name**
    - Copy URLs from the task results exactly as they appear
    - Citation markers: [0], [1] in square brackets
    - Merge duplicate URLs into one entry and renumber consistently
    - Link format: `<URL|title>`";

/// Produces the assistant message that answers the latest user question from
/// the plan's completed task results. The caller appends it to the session.
#[derive(Clone)]
pub struct FinalAnswerService {
    llm: Arc<dyn LlmPort>,
}

impl FinalAnswerService {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    pub async fn execute(
        &self,
        session: &ChatSession,
        task_plan: &TaskPlan,
    ) -> Result<Message, ServiceError> {
        let latest = session.last_user_message()?;
        let latest_id = latest.id();
        let task_results = task_plan.format_task_results()?;
        let prompt = build_prompt(latest.content(), &task_results);

        let mut messages = vec![Message::system(SYSTEM_PROMPT)?];
        messages.extend(
            session
                .messages()
                .iter()
                .filter(|m| m.id() != latest_id)
                .cloned(),
        );
        messages.push(Message::user(&prompt)?);

        let answer = self.llm.generate(&messages).await?;
        Ok(Message::assistant(&answer)?)
    }
}

fn build_prompt(user_question: &str, task_results: &str) -> String {
    format!(
        "## Current date:\n{}\n\n## User question:\n{}\n\n## Task results:\n{}\n\n\
         Merge the task results above into a comprehensive answer to the \
         user's question.\n\n\
         **Important: copy every URL from the task results exactly, character \
         for character.**",
        current_date(),
        user_question,
        task_results,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, Role, Task};
    use crate::services::test_support::ScriptedLlm;
    use uuid::Uuid;

    fn session_and_plan() -> (ChatSession, TaskPlan) {
        let mut session = ChatSession::new("conv-1", None, "U1", "C1");
        session
            .add_user_message(Message::user("older question").unwrap())
            .unwrap();
        session
            .add_assistant_message(Message::assistant("older answer").unwrap())
            .unwrap();
        session
            .add_user_message(Message::user("What is new in Python?").unwrap())
            .unwrap();

        let mut task = Task::web_search("latest Python version").unwrap();
        task.complete("Python 3.13 released[0]").unwrap();
        let plan = TaskPlan::new(
            session.last_user_message().unwrap().id(),
            vec![task],
        )
        .unwrap();
        (session, plan)
    }

    #[tokio::test]
    async fn produces_assistant_message() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("Integrated answer.");

        let (session, plan) = session_and_plan();
        let message = FinalAnswerService::new(llm)
            .execute(&session, &plan)
            .await
            .unwrap();
        assert_eq!(message.role(), Role::Assistant);
        assert_eq!(message.content(), "Integrated answer.");
    }

    #[tokio::test]
    async fn history_excludes_the_latest_user_message() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_text("answer");

        let (session, plan) = session_and_plan();
        FinalAnswerService::new(llm.clone())
            .execute(&session, &plan)
            .await
            .unwrap();

        let calls = llm.calls.lock().unwrap();
        let msgs = &calls[0].messages;
        assert_eq!(msgs[0].role(), Role::System);
        assert_eq!(msgs[1].content(), "older question");
        assert_eq!(msgs[2].content(), "older answer");
        // The latest question appears only inside the templated user prompt.
        let last = msgs.last().unwrap();
        assert_eq!(last.role(), Role::User);
        assert!(last.content().contains("What is new in Python?"));
        assert!(last.content().contains("Python 3.13 released[0]"));
        assert_eq!(msgs.len(), 4);
    }

    #[tokio::test]
    async fn all_tasks_failed_propagates() {
        let llm = Arc::new(ScriptedLlm::new());
        let mut session = ChatSession::new("conv-1", None, "U1", "C1");
        session
            .add_user_message(Message::user("q").unwrap())
            .unwrap();

        let mut task = Task::web_search("t").unwrap();
        task.fail("no results");
        let plan = TaskPlan::new(Uuid::new_v4(), vec![task]).unwrap();

        let err = FinalAnswerService::new(llm.clone())
            .execute(&session, &plan)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::AllTasksFailed)
        ));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_user_message_propagates() {
        let llm = Arc::new(ScriptedLlm::new());
        let session = ChatSession::new("conv-1", None, "U1", "C1");
        let mut task = Task::web_search("t").unwrap();
        task.complete("r").unwrap();
        let plan = TaskPlan::new(Uuid::new_v4(), vec![task]).unwrap();

        let err = FinalAnswerService::new(llm)
            .execute(&session, &plan)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::UserMessageNotFound)
        ));
    }
}
