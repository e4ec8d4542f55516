//! Per-category observation prompts

use crate::analysis::{Category, CategoryObservations, PromptSet};
use crate::error::InferenceError;
use crate::provider::{ChatMessage, CompletionOptions, ImageAttachment, ModelProviderClient};
use std::sync::Arc;
use tracing::debug;

pub const CATEGORY_MAX_TOKENS: u32 = 500;

#[derive(Clone)]
pub struct CategoryAnalyzer {
    provider: Arc<dyn ModelProviderClient>,
    prompts: Arc<PromptSet>,
    options: CompletionOptions,
}

impl CategoryAnalyzer {
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

    /// One call per category, in [`Category::ALL`] order.
    ///
    /// The first failure aborts the frame; observations gathered so far are
    /// discarded.
    pub async fn analyze(
        &self,
        image: &ImageAttachment,
        context: &str,
    ) -> Result<CategoryObservations, InferenceError> {
        let mut observations = CategoryObservations::new();
        for category in Category::ALL {
            let messages = vec![
                ChatMessage::system(self.prompts.category_system.clone()),
                ChatMessage::user(self.prompts.render_category(category, context))
                    .with_image(image.clone()),
            ];
            let response = self.provider.complete(messages, self.options.clone()).await?;
            debug!(%category, chars = response.content.len(), "Category observation");
            observations.insert(category, response.content.trim().to_string());
        }
        Ok(observations)
    }
}
