//! Answer one inbound user request: load or create the session, run the
//! workflow, append the turn, persist.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{ChatSession, Message};
use crate::repository::ChatSessionRepository;
use crate::usecase::UseCaseError;
use crate::workflow::{RequestContext, Workflow};

#[derive(Debug, Clone)]
pub struct AnswerRequestInput {
    pub user_message: String,
    pub context: RequestContext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRequestOutput {
    pub answer: String,
    /// Id of the appended assistant message, the key for a later feedback
    /// submission.
    pub message_id: Uuid,
}

pub struct AnswerToUserRequestUseCase {
    workflow: Arc<Workflow>,
    sessions: ChatSessionRepository,
}

impl AnswerToUserRequestUseCase {
    pub fn new(workflow: Arc<Workflow>, sessions: ChatSessionRepository) -> Self {
        Self { workflow, sessions }
    }

    pub async fn execute(
        &self,
        input: AnswerRequestInput,
    ) -> Result<AnswerRequestOutput, UseCaseError> {
        if input.user_message.trim().is_empty() {
            return Err(UseCaseError::InvalidInput("user_message"));
        }
        if input.context.conversation_id.trim().is_empty() {
            return Err(UseCaseError::InvalidInput("conversation_id"));
        }

        let conversation_id = &input.context.conversation_id;
        let mut session = match self.sessions.find_by_id(conversation_id).await? {
            Some(session) => session,
            None => ChatSession::new(
                conversation_id,
                input.context.thread_ts.as_deref(),
                input.context.user_id.as_deref().unwrap_or(""),
                input.context.channel_id.as_deref().unwrap_or(""),
            ),
        };

        session.add_user_message(Message::user(&input.user_message)?)?;

        let result = self.workflow.execute(&session, &input.context).await?;

        // Append the answer and the plan exactly once, then persist the turn.
        session.add_assistant_message(Message::assistant(&result.answer)?)?;
        session.add_task_plan(result.task_plan);
        self.sessions.save(&session).await?;

        Ok(AnswerRequestOutput {
            answer: result.answer,
            message_id: session.last_assistant_message_id()?,
        })
    }
}
