//! Prompt templates. Wording is configuration; only the placeholders matter.
//!
//! Placeholders: `{context}` in relevance and category prompts, `{instruction}`
//! in the category user prompt, `{combined_analyses}` in the summary prompt.

use crate::analysis::Category;
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_CONTEXT: &str = "{context}";
pub const PLACEHOLDER_INSTRUCTION: &str = "{instruction}";
pub const PLACEHOLDER_COMBINED: &str = "{combined_analyses}";

/// Instruction text per category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryInstructions {
    pub operational: String,
    pub geotechnical: String,
    pub environmental: String,
    pub safety: String,
}

impl Default for CategoryInstructions {
    fn default() -> Self {
        Self {
            operational: "Describe visible mining operations: equipment, haul roads, \
                          stockpiles and activity levels."
                .to_string(),
            geotechnical: "Assess slope and pit wall stability, visible cracks, \
                           erosion or loose rock."
                .to_string(),
            environmental: "Describe any water discoloration or pooling and assess \
                            tailings condition and possible overflow risks."
                .to_string(),
            safety: "Identify visible safety hazards (e.g., loose rocks, equipment)."
                .to_string(),
        }
    }
}

impl CategoryInstructions {
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Operational => &self.operational,
            Category::Geotechnical => &self.geotechnical,
            Category::Environmental => &self.environmental,
            Category::Safety => &self.safety,
        }
    }
}

/// Every prompt the analysis pipeline sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    pub relevance_system: String,
    pub relevance_user: String,
    pub category_system: String,
    pub category_user: String,
    pub categories: CategoryInstructions,
    pub summary_system: String,
    pub summary_user: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            relevance_system: "You are a mining-site relevance checker. \
                               Answer strictly 'yes' or 'no'."
                .to_string(),
            relevance_user: "Context: {context}. Is this image of a mining site?".to_string(),
            category_system: "You are a mining site analysis assistant. \
                              Provide concise observations for each category."
                .to_string(),
            category_user: "Context: {context}. {instruction}".to_string(),
            categories: CategoryInstructions::default(),
            summary_system: "You are a mining site expert.".to_string(),
            summary_user: "Summarize the following analyses into a final conclusion:\n\n\
                           {combined_analyses}"
                .to_string(),
        }
    }
}

impl PromptSet {
    pub fn render_relevance(&self, context: &str) -> String {
        self.relevance_user.replace(PLACEHOLDER_CONTEXT, context)
    }

    pub fn render_category(&self, category: Category, context: &str) -> String {
        // Instruction first so a `{context}` inside it is also filled in
        self.category_user
            .replace(PLACEHOLDER_INSTRUCTION, self.categories.get(category))
            .replace(PLACEHOLDER_CONTEXT, context)
    }

    pub fn render_summary(&self, combined_analyses: &str) -> String {
        self.summary_user.replace(PLACEHOLDER_COMBINED, combined_analyses)
    }

    /// Templates missing a required placeholder
    pub fn validation_errors(&self) -> Vec<String> {
        let checks = [
            ("relevance_user", &self.relevance_user, PLACEHOLDER_CONTEXT),
            ("category_user", &self.category_user, PLACEHOLDER_CONTEXT),
            ("category_user", &self.category_user, PLACEHOLDER_INSTRUCTION),
            ("summary_user", &self.summary_user, PLACEHOLDER_COMBINED),
        ];
        checks
            .iter()
            .filter(|(_, template, placeholder)| !template.contains(placeholder))
            .map(|(name, _, placeholder)| {
                format!("analysis.prompts.{} must contain {}", name, placeholder)
            })
            .collect()
    }
}
