use std::sync::Arc;

use domains::TokenVerifier;
use services::{FeedbackService, MessageService};

use crate::metrics::Metrics;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<MessageService>,
    pub feedback: Arc<FeedbackService>,
    pub tokens: Arc<dyn TokenVerifier>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        messages: MessageService,
        feedback: FeedbackService,
        tokens: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            messages: Arc::new(messages),
            feedback: Arc::new(feedback),
            tokens,
            metrics: Arc::new(Metrics::new()),
        }
    }
}
