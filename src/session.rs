//! Site Session
//!
//! Owns the per-video state: the frame list of the latest extraction and the
//! analysis map of the latest analysis run. Starting an extraction invalidates
//! any analysis. Extraction and analysis runs are serialized by an async run
//! lock held for the lifetime of the run's stream; state reads and writes go
//! through a short-lived `RwLock`.

use crate::analysis::{
    AnalysisAggregator, AnalysisMap, CategoryAnalyzer, ConclusionReport, FrameAnalysis,
    RelevanceFilter, Summarizer,
};
use crate::config::MinewatchConfig;
use crate::error::{ApiError, ValidationError};
use crate::extraction::{ExtractionEvent, FrameExtractor};
use crate::frame::{FrameSample, FrameStore, RemoveOutcome};
use crate::provider::ModelProviderClient;
use crate::video::VideoDecoder;
use futures::stream::{BoxStream, Stream, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct SessionState {
    /// Bumped by every extraction or adoption
    generation: u64,
    frames: Vec<FrameSample>,
    analysis: Option<AnalysisMap>,
}

impl SessionState {
    fn has_frame(&self, path: &Path) -> bool {
        self.frames.iter().any(|frame| frame.file_path == path)
    }

    /// Start a new generation with `frames`; any analysis is discarded
    fn reset(&mut self, frames: Vec<FrameSample>) -> u64 {
        self.generation += 1;
        self.frames = frames;
        self.analysis = None;
        self.generation
    }
}

/// A frame to remove, by index or by bare file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRef::Index(index) => write!(f, "{}", index),
            FrameRef::Name(name) => f.write_str(name),
        }
    }
}

/// Digits name an index, anything else a file name
impl From<&str> for FrameRef {
    fn from(raw: &str) -> Self {
        match raw.trim().parse::<usize>() {
            Ok(index) => FrameRef::Index(index),
            Err(_) => FrameRef::Name(raw.to_string()),
        }
    }
}

/// `{"frames": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameRemovalRequest {
    pub frames: Vec<FrameRef>,
}

impl FrameRemovalRequest {
    pub fn new(frames: Vec<FrameRef>) -> Result<Self, ValidationError> {
        if frames.is_empty() {
            return Err(ValidationError::EmptyRemovalRequest);
        }
        Ok(Self { frames })
    }

    /// Parse and validate a JSON request body
    pub fn from_json(body: &str) -> Result<Self, ValidationError> {
        let request: FrameRemovalRequest = serde_json::from_str(body)
            .map_err(|e| ValidationError::InvalidRemovalRequest(e.to_string()))?;
        Self::new(request.frames)
    }
}

/// A frame that could not be removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalFailure {
    pub frame: String,
    pub reason: String,
}

/// Per-item outcome of a removal request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalReport {
    pub removed: Vec<String>,
    pub not_found: Vec<String>,
    pub failed: Vec<RemovalFailure>,
}

/// Stream of one extraction or analysis run.
///
/// Holds the session's run lock until the run ends (terminal item or end of
/// stream) or the stream is dropped.
pub struct RunStream<T> {
    inner: BoxStream<'static, T>,
    run: Option<OwnedMutexGuard<()>>,
    ends_run: fn(&T) -> bool,
}

impl<T> RunStream<T> {
    fn new(inner: BoxStream<'static, T>, run: OwnedMutexGuard<()>, ends_run: fn(&T) -> bool) -> Self {
        Self {
            inner,
            run: Some(run),
            ends_run,
        }
    }

    /// Whether the run lock is still held
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }
}

impl<T> Stream for RunStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let poll = self.inner.poll_next_unpin(cx);
        let finished = match &poll {
            Poll::Ready(None) => true,
            Poll::Ready(Some(item)) => (self.ends_run)(item),
            Poll::Pending => false,
        };
        if finished {
            self.run.take();
        }
        poll
    }
}

pub type SessionExtraction = RunStream<ExtractionEvent>;
pub type SessionAnalysis = RunStream<(FrameSample, FrameAnalysis)>;

/// Per-video session state and the pipelines that act on it
#[derive(Clone)]
pub struct SiteSession {
    store: FrameStore,
    extractor: FrameExtractor,
    aggregator: AnalysisAggregator,
    summarizer: Summarizer,
    default_context: String,
    state: Arc<RwLock<SessionState>>,
    run_lock: Arc<Mutex<()>>,
}

impl SiteSession {
    pub fn new(
        store: FrameStore,
        extractor: FrameExtractor,
        aggregator: AnalysisAggregator,
        summarizer: Summarizer,
        default_context: impl Into<String>,
    ) -> Self {
        Self {
            store,
            extractor,
            aggregator,
            summarizer,
            default_context: default_context.into(),
            state: Arc::new(RwLock::new(SessionState::default())),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Wire every component from configuration
    pub fn from_config(
        config: &MinewatchConfig,
        provider: Arc<dyn ModelProviderClient>,
        decoder: Arc<dyn VideoDecoder>,
    ) -> Self {
        let prompts = Arc::new(config.analysis.prompts.clone());
        let base_options = config.provider.completion_options();
        let with_tokens = |max_tokens: u32| base_options.clone().with_max_tokens(max_tokens);

        let aggregator = AnalysisAggregator::new(
            RelevanceFilter::new(
                Arc::clone(&provider),
                Arc::clone(&prompts),
                with_tokens(config.analysis.relevance_max_tokens),
            ),
            CategoryAnalyzer::new(
                Arc::clone(&provider),
                Arc::clone(&prompts),
                with_tokens(config.analysis.category_max_tokens),
            ),
        );
        let summarizer = Summarizer::new(
            provider,
            prompts,
            with_tokens(config.analysis.summary_max_tokens),
        );
        let extractor = FrameExtractor::new(decoder)
            .with_default_interval(config.extraction.default_interval)
            .with_jpeg_quality(config.extraction.jpeg_quality);

        Self::new(
            FrameStore::new(&config.extraction.frames_dir),
            extractor,
            aggregator,
            summarizer,
            config.analysis.default_context.clone(),
        )
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn default_context(&self) -> &str {
        &self.default_context
    }

    /// Frames of the latest extraction, ascending by index
    pub fn frames(&self) -> Vec<FrameSample> {
        self.state.read().frames.clone()
    }

    /// Snapshot of the latest analysis, if one has started since the last
    /// extraction
    pub fn analysis(&self) -> Option<AnalysisMap> {
        self.state.read().analysis.clone()
    }

    /// Begin a new extraction into the session's frame directory.
    ///
    /// Waits for any running extraction or analysis to finish, then clears the
    /// frame list and analysis. Frames are recorded as they are written.
    pub async fn start_extraction(&self, video: &Path, interval: Option<i64>) -> SessionExtraction {
        let run = Arc::clone(&self.run_lock).lock_owned().await;
        let generation = self.state.write().reset(Vec::new());

        let events = self
            .extractor
            .extract(video, &self.store, interval, CancellationToken::new())
            .into_stream();

        let state = Arc::clone(&self.state);
        let events = events
            .inspect(move |event| {
                if let ExtractionEvent::FrameExtracted { frame } = event {
                    let mut state = state.write();
                    if state.generation == generation {
                        state.frames.push(frame.clone());
                    }
                }
            })
            .boxed();

        RunStream::new(events, run, ExtractionEvent::is_terminal)
    }

    /// Load frames already present in the frame directory as the current
    /// frame list. Returns how many were found.
    pub async fn adopt_frames(&self) -> Result<usize, ApiError> {
        let _run = self.run_lock.lock().await;
        let frames = self.store.list()?;
        let count = frames.len();
        self.state.write().reset(frames);
        info!(
            directory = %self.store.directory().display(),
            frames = count,
            "Adopted frames from disk"
        );
        Ok(count)
    }

    /// Analyse the current frames incrementally.
    ///
    /// `context` falls back to the session default. The previous analysis is
    /// replaced as soon as the run starts; each result is recorded only if
    /// its frame is still part of the session.
    pub async fn analysis_stream(&self, context: Option<&str>) -> Result<SessionAnalysis, ApiError> {
        let run = Arc::clone(&self.run_lock).lock_owned().await;
        let context = context
            .map(str::to_string)
            .unwrap_or_else(|| self.default_context.clone());

        let (generation, frames) = {
            let mut state = self.state.write();
            if state.frames.is_empty() {
                return Err(ApiError::NoFramesExtracted);
            }
            state.analysis = Some(AnalysisMap::new());
            (state.generation, state.frames.clone())
        };

        let state = Arc::clone(&self.state);
        let results = self
            .aggregator
            .run_stream(frames, context)
            .inspect(move |(frame, analysis)| {
                let mut state = state.write();
                if state.generation != generation || !state.has_frame(&frame.file_path) {
                    return;
                }
                state
                    .analysis
                    .get_or_insert_with(AnalysisMap::new)
                    .insert(frame.clone(), analysis.clone());
            })
            .boxed();

        Ok(RunStream::new(results, run, |_| false))
    }

    /// Analyse every current frame and return the resulting map
    pub async fn run_analysis(&self, context: Option<&str>) -> Result<AnalysisMap, ApiError> {
        let mut results = self.analysis_stream(context).await?;
        while results.next().await.is_some() {}
        Ok(self.analysis().unwrap_or_default())
    }

    /// Summarize the latest analysis. The analysis is left untouched.
    pub async fn summarize(&self) -> Result<ConclusionReport, ApiError> {
        let map = self.analysis().ok_or(ApiError::NoAnalysis)?;
        Ok(self.summarizer.summarize(&map).await?)
    }

    /// Delete frames from disk and from the session.
    ///
    /// Each frame is handled independently. A frame absent on disk but still
    /// known to the session counts as removed. Frame list and analysis are
    /// updated together in one critical section.
    pub fn remove_frames(&self, request: &FrameRemovalRequest) -> RemovalReport {
        let mut report = RemovalReport::default();
        let mut deleted: Vec<(String, PathBuf)> = Vec::new();
        let mut missing: Vec<(String, PathBuf)> = Vec::new();

        for frame in &request.frames {
            let label = frame.to_string();
            let path = match frame {
                FrameRef::Index(index) => self.store.frame_path(*index),
                FrameRef::Name(name) => match self.store.resolve_name(name) {
                    Ok(path) => path,
                    Err(e) => {
                        report.failed.push(RemovalFailure {
                            frame: label,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                },
            };

            match FrameStore::remove(&path) {
                Ok(RemoveOutcome::Removed) => deleted.push((label, path)),
                Ok(RemoveOutcome::NotFound) => missing.push((label, path)),
                Err(e) => {
                    warn!(frame = %label, error = %e, "Frame removal failed");
                    report.failed.push(RemovalFailure {
                        frame: label,
                        reason: e.to_string(),
                    });
                }
            }
        }

        {
            let mut state = self.state.write();
            for (label, path) in missing {
                if state.has_frame(&path) {
                    deleted.push((label, path));
                } else {
                    report.not_found.push(label);
                }
            }

            let removed: HashSet<&Path> = deleted.iter().map(|(_, path)| path.as_path()).collect();
            state
                .frames
                .retain(|frame| !removed.contains(frame.file_path.as_path()));
            if let Some(analysis) = state.analysis.as_mut() {
                analysis.retain(|entry| !removed.contains(entry.frame.file_path.as_path()));
            }
        }

        report.removed = deleted.into_iter().map(|(label, _)| label).collect();
        info!(
            removed = report.removed.len(),
            not_found = report.not_found.len(),
            failed = report.failed.len(),
            "Frames removed"
        );
        report
    }
}
