//! Analysis aggregation across the frames of one extraction run
//!
//! One algorithm with two consumption modes: [`AnalysisAggregator::run_stream`]
//! yields `(frame, analysis)` pairs as each frame finishes, and
//! [`AnalysisAggregator::run_batch`] collects the same stream into a fresh
//! [`AnalysisMap`].

use crate::analysis::{CategoryAnalyzer, CategoryObservations, RelevanceFilter};
use crate::error::InferenceError;
use crate::frame::{FrameSample, FrameStore};
use crate::provider::ImageAttachment;
use futures::stream::{self, BoxStream, StreamExt};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Outcome of analysing one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameAnalysis {
    /// Not a mining-site image; no categories were requested
    Irrelevant,
    /// Every category answered
    Relevant { categories: CategoryObservations },
    /// A remote call or the image read failed
    Failed { error: String },
}

impl FrameAnalysis {
    pub fn is_relevant(&self) -> bool {
        matches!(self, FrameAnalysis::Relevant { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FrameAnalysis::Failed { .. })
    }

    pub fn observations(&self) -> Option<&CategoryObservations> {
        match self {
            FrameAnalysis::Relevant { categories } => Some(categories),
            _ => None,
        }
    }
}

/// One frame with its analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    pub frame: FrameSample,
    pub analysis: FrameAnalysis,
}

/// Counts over an [`AnalysisMap`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub frames: usize,
    pub relevant: usize,
    pub irrelevant: usize,
    pub failed: usize,
    pub observations: usize,
}

/// Analysis results keyed by frame, iterated in ascending frame index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisMap {
    entries: BTreeMap<usize, AnalysisEntry>,
}

impl AnalysisMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame: FrameSample, analysis: FrameAnalysis) {
        self.entries
            .insert(frame.index, AnalysisEntry { frame, analysis });
    }

    pub fn get(&self, index: usize) -> Option<&AnalysisEntry> {
        self.entries.get(&index)
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&AnalysisEntry) -> bool,
    {
        self.entries.retain(|_, entry| keep(entry));
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> AnalysisStats {
        let mut stats = AnalysisStats {
            frames: self.entries.len(),
            ..AnalysisStats::default()
        };
        for entry in self.entries.values() {
            match &entry.analysis {
                FrameAnalysis::Irrelevant => stats.irrelevant += 1,
                FrameAnalysis::Relevant { categories } => {
                    stats.relevant += 1;
                    stats.observations += categories.len();
                }
                FrameAnalysis::Failed { .. } => stats.failed += 1,
            }
        }
        stats
    }
}

impl FromIterator<(FrameSample, FrameAnalysis)> for AnalysisMap {
    fn from_iter<I: IntoIterator<Item = (FrameSample, FrameAnalysis)>>(iter: I) -> Self {
        let mut map = AnalysisMap::new();
        for (frame, analysis) in iter {
            map.insert(frame, analysis);
        }
        map
    }
}

// Serialized as an ordered list so JSON output keeps frame order
impl Serialize for AnalysisMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for entry in self.entries.values() {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

/// Runs relevance and category analysis over a list of frames
#[derive(Clone)]
pub struct AnalysisAggregator {
    relevance: RelevanceFilter,
    categories: CategoryAnalyzer,
}

impl AnalysisAggregator {
    pub fn new(relevance: RelevanceFilter, categories: CategoryAnalyzer) -> Self {
        Self {
            relevance,
            categories,
        }
    }

    /// Analyse one frame. Never fails: errors become [`FrameAnalysis::Failed`].
    pub async fn analyze_frame(&self, frame: &FrameSample, context: &str) -> FrameAnalysis {
        let bytes = match FrameStore::read(&frame.file_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let e = InferenceError::from(e);
                warn!(index = frame.index, error = %e, "Frame image unreadable");
                return FrameAnalysis::Failed {
                    error: e.to_string(),
                };
            }
        };
        let image = ImageAttachment::jpeg(bytes);

        let relevant = match self.relevance.is_relevant(&image, context).await {
            Ok(relevant) => relevant,
            Err(e) => {
                warn!(index = frame.index, error = %e, "Relevance check failed");
                return FrameAnalysis::Failed {
                    error: e.to_string(),
                };
            }
        };
        if !relevant {
            debug!(index = frame.index, "Frame not relevant");
            return FrameAnalysis::Irrelevant;
        }

        match self.categories.analyze(&image, context).await {
            Ok(categories) => {
                debug!(index = frame.index, "Frame analysed");
                FrameAnalysis::Relevant { categories }
            }
            Err(e) => {
                warn!(index = frame.index, error = %e, "Category analysis failed");
                FrameAnalysis::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Lazily analyse `frames` in order, one frame at a time
    pub fn run_stream(
        &self,
        frames: Vec<FrameSample>,
        context: String,
    ) -> BoxStream<'static, (FrameSample, FrameAnalysis)> {
        info!(frames = frames.len(), "Analysis started");
        let aggregator = self.clone();
        stream::iter(frames)
            .then(move |frame| {
                let aggregator = aggregator.clone();
                let context = context.clone();
                async move {
                    let analysis = aggregator.analyze_frame(&frame, &context).await;
                    (frame, analysis)
                }
            })
            .boxed()
    }

    /// Analyse every frame and collect the results
    pub async fn run_batch(&self, frames: Vec<FrameSample>, context: String) -> AnalysisMap {
        let items: Vec<_> = self.run_stream(frames, context).collect().await;
        let map: AnalysisMap = items.into_iter().collect();
        let stats = map.stats();
        info!(
            frames = stats.frames,
            relevant = stats.relevant,
            irrelevant = stats.irrelevant,
            failed = stats.failed,
            "Analysis complete"
        );
        map
    }
}
