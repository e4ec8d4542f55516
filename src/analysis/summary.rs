//! Final summary over all frame observations

use crate::analysis::{AnalysisMap, PromptSet};
use crate::error::InferenceError;
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const SUMMARY_MAX_TOKENS: u32 = 300;

/// Narrative conclusion built from an [`AnalysisMap`]. Regenerated on every
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConclusionReport {
    pub narrative: String,
    pub frame_count: usize,
    pub observation_count: usize,
    pub model: String,
    pub generated_at: String,
}

#[derive(Clone)]
pub struct Summarizer {
    provider: Arc<dyn ModelProviderClient>,
    prompts: Arc<PromptSet>,
    options: CompletionOptions,
}

impl Summarizer {
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

    /// One remote call over every observation in `map`.
    ///
    /// Fails with [`InferenceError::NothingToSummarize`] without calling the
    /// model when the map holds no observations. The map is never modified.
    pub async fn summarize(&self, map: &AnalysisMap) -> Result<ConclusionReport, InferenceError> {
        if map.is_empty() {
            return Err(InferenceError::NothingToSummarize(
                "no frames have been analysed".to_string(),
            ));
        }
        let lines = flatten_observations(map);
        if lines.is_empty() {
            return Err(InferenceError::NothingToSummarize(format!(
                "none of the {} analysed frames produced observations",
                map.len()
            )));
        }

        let messages = vec![
            ChatMessage::system(self.prompts.summary_system.clone()),
            ChatMessage::user(self.prompts.render_summary(&lines.join("\n"))),
        ];
        let response = self.provider.complete(messages, self.options.clone()).await?;

        let report = ConclusionReport {
            narrative: response.content,
            frame_count: map.len(),
            observation_count: lines.len(),
            model: response.model,
            generated_at: chrono::Utc::now().to_rfc3339(),
        };
        info!(
            frames = report.frame_count,
            observations = report.observation_count,
            "Summary generated"
        );
        Ok(report)
    }
}

/// `frame_<index> / <category>: <text>` lines in ascending frame order
pub fn flatten_observations(map: &AnalysisMap) -> Vec<String> {
    map.iter()
        .filter_map(|entry| {
            let label = entry.frame.label();
            entry.analysis.observations().map(|categories| {
                categories
                    .iter()
                    .map(move |(category, text)| format!("{} / {}: {}", label, category, text))
                    .collect::<Vec<_>>()
            })
        })
        .flatten()
        .collect()
}
