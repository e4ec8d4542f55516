//! CLI route: single route table and run context. Dispatches to the site
//! session and presentation.

use crate::analysis::AnalysisMap;
use crate::cli::command_name;
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_analysis_text, format_extraction_text, format_frames_text, format_removal_text,
    format_run_text, to_json, AnalysisOutcome, ExtractionOutcome, RunOutcome,
};
use crate::config::{ConfigLoader, MinewatchConfig};
use crate::error::{ApiError, StorageError};
use crate::extraction::{resolve_interval, ExtractionEvent};
use crate::progress::{ProgressRecorder, ProgressSink, SessionStatus};
use crate::provider::{ModelProviderClient, ProviderFactory, UnconfiguredProvider};
use crate::session::{FrameRef, FrameRemovalRequest, SiteSession};
use crate::video::{default_decoder, UnavailableDecoder, VideoDecoder};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace, effective configuration and
/// the optional progress recorder.
pub struct RunContext {
    workspace_root: PathBuf,
    config: MinewatchConfig,
    progress: Option<ProgressRecorder>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::from_config(workspace_root, config)
    }

    /// Create run context from an already loaded configuration
    pub fn from_config(workspace_root: PathBuf, mut config: MinewatchConfig) -> Result<Self, ApiError> {
        config.validate().map_err(|issues| {
            ApiError::ConfigError(
                issues
                    .iter()
                    .map(|issue| issue.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        if config.extraction.frames_dir.is_relative() {
            config.extraction.frames_dir = workspace_root.join(&config.extraction.frames_dir);
        }

        Ok(Self {
            workspace_root,
            config,
            progress: None,
        })
    }

    /// Emit progress events for every command to `sink`
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(ProgressRecorder::new(sink));
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &MinewatchConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        if let Commands::Config { check } = command {
            return self.handle_config(*check);
        }

        self.record(|p| p.start(command_name(command)));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(StorageError::from)?;
        let result = runtime.block_on(self.execute_inner(command));

        match &result {
            Ok(_) => self.record(|p| p.finish(SessionStatus::Completed, None)),
            Err(e) => self.record(|p| p.finish(SessionStatus::Failed, Some(e.to_string()))),
        }
        result
    }

    /// Site session wired to the configured provider and decoder. Either one
    /// may be unavailable; the failure then surfaces on first use.
    pub fn session(&self) -> SiteSession {
        SiteSession::from_config(&self.config, self.provider_client(), self.decoder())
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        let session = self.session();
        match command {
            Commands::Extract {
                video,
                interval,
                format,
            } => {
                let outcome = self.extract(&session, video, interval.as_deref()).await?;
                match format {
                    OutputFormat::Json => to_json(&outcome),
                    OutputFormat::Text => Ok(format_extraction_text(&outcome)),
                }
            }
            Commands::Analyze {
                context,
                summarize,
                format,
            } => {
                let adopted = session.adopt_frames().await?;
                info!(frames = adopted, "Analysing frames from disk");
                let outcome = self.analyze(&session, context.as_deref(), *summarize).await?;
                match format {
                    OutputFormat::Json => to_json(&outcome),
                    OutputFormat::Text => Ok(format_analysis_text(&outcome)),
                }
            }
            Commands::Run {
                video,
                interval,
                context,
                format,
            } => {
                let extraction = self.extract(&session, video, interval.as_deref()).await?;
                let analysis = match &extraction.failure {
                    Some(failure) if extraction.frames.is_empty() => {
                        warn!(failure = %failure, "Extraction produced no frames, skipping analysis");
                        None
                    }
                    _ => Some(self.analyze(&session, context.as_deref(), true).await?),
                };
                let outcome = RunOutcome {
                    extraction,
                    analysis,
                };
                match format {
                    OutputFormat::Json => to_json(&outcome),
                    OutputFormat::Text => Ok(format_run_text(&outcome)),
                }
            }
            Commands::Frames { format } => {
                let frames = session.store().list()?;
                match format {
                    OutputFormat::Json => to_json(&frames),
                    OutputFormat::Text => Ok(format_frames_text(&frames)),
                }
            }
            Commands::Remove {
                frames,
                json,
                format,
            } => {
                let request = match json {
                    Some(body) => FrameRemovalRequest::from_json(body)?,
                    None => FrameRemovalRequest::new(
                        frames.iter().map(|f| FrameRef::from(f.as_str())).collect(),
                    )?,
                };
                session.adopt_frames().await?;
                let report = session.remove_frames(&request);
                self.record(|p| p.frames_removed(&report));
                match format {
                    OutputFormat::Json => to_json(&report),
                    OutputFormat::Text => Ok(format_removal_text(&report)),
                }
            }
            Commands::Config { check } => self.handle_config(*check),
        }
    }

    async fn extract(
        &self,
        session: &SiteSession,
        video: &Path,
        interval: Option<&str>,
    ) -> Result<ExtractionOutcome, ApiError> {
        let resolved = resolve_interval(interval, self.config.extraction.default_interval);
        let mut outcome = ExtractionOutcome {
            interval: resolved.value,
            ..ExtractionOutcome::default()
        };
        if let Some(warning) = resolved.warning {
            warn!(warning = %warning, "Ignoring requested interval");
            outcome.warnings.push(warning.to_string());
        }

        let mut events = session
            .start_extraction(video, Some(resolved.value as i64))
            .await;
        while let Some(event) = events.next().await {
            self.record(|p| p.extraction(&event));
            match event {
                ExtractionEvent::FrameExtracted { frame } => outcome.frames.push(frame),
                ExtractionEvent::WriteWarning {
                    index,
                    source_offset,
                    reason,
                } => outcome.warnings.push(format!(
                    "frame {} (source offset {}) not written: {}",
                    index, source_offset, reason
                )),
                ExtractionEvent::ExtractionFailed { reason } => outcome.failure = Some(reason),
                ExtractionEvent::ExtractionComplete { .. } => {}
            }
        }
        Ok(outcome)
    }

    async fn analyze(
        &self,
        session: &SiteSession,
        context: Option<&str>,
        summarize: bool,
    ) -> Result<AnalysisOutcome, ApiError> {
        let mut results = session.analysis_stream(context).await?;
        while let Some((frame, analysis)) = results.next().await {
            self.record(|p| p.frame_analyzed(&frame, &analysis));
        }
        drop(results);

        let analysis: AnalysisMap = session.analysis().unwrap_or_default();
        self.record(|p| p.analysis_complete(analysis.stats()));

        let mut outcome = AnalysisOutcome {
            analysis,
            summary: None,
            summary_error: None,
        };
        if summarize {
            match session.summarize().await {
                Ok(report) => {
                    self.record(|p| p.summary(&report));
                    outcome.summary = Some(report);
                }
                Err(e) => {
                    warn!(error = %e, "Summary not generated");
                    outcome.summary_error = Some(e.to_string());
                }
            }
        }
        Ok(outcome)
    }

    fn handle_config(&self, check: bool) -> Result<String, ApiError> {
        if check {
            return Ok("Configuration is valid.".to_string());
        }
        self.config
            .to_toml_redacted()
            .map_err(|e| ApiError::ConfigError(format!("Failed to render configuration: {}", e)))
    }

    fn provider_client(&self) -> Arc<dyn ModelProviderClient> {
        let provider = &self.config.provider;
        let client = provider
            .to_model_provider()
            .and_then(|model| ProviderFactory::create_client(&model, provider.timeouts()));
        match client {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Model provider unavailable");
                Arc::new(UnconfiguredProvider::new(e.to_string(), provider.model.clone()))
            }
        }
    }

    fn decoder(&self) -> Arc<dyn VideoDecoder> {
        default_decoder().unwrap_or_else(|e| {
            warn!(error = %e, "Video decoder unavailable");
            Arc::new(UnavailableDecoder::new(e.to_string()))
        })
    }

    fn record(&self, emit: impl FnOnce(&ProgressRecorder)) {
        if let Some(progress) = &self.progress {
            emit(progress);
        }
    }
}
