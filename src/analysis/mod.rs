//! Frame Analysis
//!
//! Per-frame relevance filtering, per-category observation prompts, aggregation
//! across an extraction run and the final summary.

pub mod aggregator;
pub mod category;
pub mod prompts;
pub mod relevance;
pub mod summary;

pub use aggregator::{AnalysisAggregator, AnalysisEntry, AnalysisMap, AnalysisStats, FrameAnalysis};
pub use category::CategoryAnalyzer;
pub use prompts::{CategoryInstructions, PromptSet};
pub use relevance::RelevanceFilter;
pub use summary::{ConclusionReport, Summarizer};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Observation category. Declaration order is the order categories are
/// prompted and reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Operational,
    Geotechnical,
    Environmental,
    Safety,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Operational,
        Category::Geotechnical,
        Category::Environmental,
        Category::Safety,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Operational => "operational",
            Category::Geotechnical => "geotechnical",
            Category::Environmental => "environmental",
            Category::Safety => "safety",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trimmed model answer per category
pub type CategoryObservations = BTreeMap<Category, String>;
