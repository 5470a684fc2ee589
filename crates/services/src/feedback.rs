//! Site feedback intake.

use std::sync::Arc;

use domains::{AppError, Feedback, FeedbackRepo, NewFeedback, Result};
use tracing::info;

use crate::validation::validate_feedback;

pub struct FeedbackService {
    repo: Arc<dyn FeedbackRepo>,
}

impl FeedbackService {
    pub fn new(repo: Arc<dyn FeedbackRepo>) -> Self {
        Self { repo }
    }

    pub async fn submit(&self, feedback: NewFeedback) -> Result<Feedback> {
        validate_feedback(&feedback)?;
        let stored = self
            .repo
            .insert_feedback(NewFeedback {
                email: feedback.email.trim().to_string(),
                content: feedback.content,
            })
            .await
            .map_err(AppError::persistence)?;
        info!(feedback_id = %stored.id, "feedback received");
        Ok(stored)
    }
}
