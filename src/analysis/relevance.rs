//! Binary "is this a mining site?" check

use crate::analysis::PromptSet;
use crate::error::InferenceError;
use crate::provider::{ChatMessage, CompletionOptions, ImageAttachment, ModelProviderClient};
use std::sync::Arc;
use tracing::debug;

/// Answers are a single word, so the call is capped tightly
pub const RELEVANCE_MAX_TOKENS: u32 = 10;

#[derive(Clone)]
pub struct RelevanceFilter {
    provider: Arc<dyn ModelProviderClient>,
    prompts: Arc<PromptSet>,
    options: CompletionOptions,
}

impl RelevanceFilter {
    pub fn new(
        provider: Arc<dyn ModelProviderClient>,
        prompts: Arc<PromptSet>,
        options: CompletionOptions,
    ) -> Self {
        Self {
            provider,
            prompts,
            options,
        }
    }

    /// One remote call. Failures propagate; there is no retry.
    pub async fn is_relevant(
        &self,
        image: &ImageAttachment,
        context: &str,
    ) -> Result<bool, InferenceError> {
        let messages = vec![
            ChatMessage::system(self.prompts.relevance_system.clone()),
            ChatMessage::user(self.prompts.render_relevance(context)).with_image(image.clone()),
        ];
        let response = self.provider.complete(messages, self.options.clone()).await?;
        let relevant = interpret_answer(&response.content);
        debug!(answer = %response.content.trim(), relevant, "Relevance answer");
        Ok(relevant)
    }
}

/// True iff the trimmed, lower-cased answer starts with "yes"
pub fn interpret_answer(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with("yes")
}
