//! Record a good/bad signal on an assistant message, one per (message, user).

use uuid::Uuid;

use crate::domain::{Feedback, FeedbackKind};
use crate::repository::FeedbackRepository;
use crate::usecase::UseCaseError;

#[derive(Debug, Clone)]
pub struct FeedbackInput {
    pub message_id: String,
    pub feedback_type: String,
    pub user_id: String,
}

pub struct FeedbackUseCase {
    feedbacks: FeedbackRepository,
}

impl FeedbackUseCase {
    pub fn new(feedbacks: FeedbackRepository) -> Self {
        Self { feedbacks }
    }

    pub async fn execute(&self, input: FeedbackInput) -> Result<(), UseCaseError> {
        if input.message_id.trim().is_empty() {
            return Err(UseCaseError::InvalidInput("message_id"));
        }
        if input.user_id.trim().is_empty() {
            return Err(UseCaseError::InvalidInput("user_id"));
        }
        let kind = FeedbackKind::parse(&input.feedback_type)
            .ok_or(UseCaseError::InvalidInput("feedback_type"))?;
        let message_id = Uuid::parse_str(&input.message_id)
            .map_err(|_| UseCaseError::InvalidInput("message_id"))?;

        match self
            .feedbacks
            .find_by_message_and_user(message_id, &input.user_id)
            .await?
        {
            Some(mut existing) => {
                match kind {
                    FeedbackKind::Good => existing.make_positive(),
                    FeedbackKind::Bad => existing.make_negative(),
                }
                self.feedbacks.save(&existing).await?;
            }
            None => {
                self.feedbacks
                    .save(&Feedback::new(&input.user_id, message_id, kind))
                    .await?;
            }
        }
        Ok(())
    }
}
