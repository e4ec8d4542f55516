//! Frame Extraction
//!
//! Samples still frames from a video at a fixed stride and persists them through
//! [`FrameStore`]. An extraction is a lazy, finite, non-restartable sequence of
//! [`ExtractionEvent`]s: nothing is decoded or written until the next event is
//! requested, and a run that is dropped or cancelled stops before the next
//! decode and releases the video.

use crate::error::{StorageError, ValidationError};
use crate::frame::{FrameSample, FrameStore};
use crate::video::{VideoDecoder, VideoStream};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Stride used when none (or an unusable one) is supplied
pub const DEFAULT_FRAME_INTERVAL: u64 = 30;

/// Default JPEG quality of persisted frames
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// A normalized stride plus the reason the raw input was replaced, if it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInterval {
    pub value: u64,
    pub warning: Option<ValidationError>,
}

/// Normalize a caller-supplied interval.
///
/// Absent, non-integer and non-positive values all fall back to `default`.
/// Only non-integer text carries a warning; absence is the normal case.
pub fn resolve_interval(raw: Option<&str>, default: u64) -> ResolvedInterval {
    let default = default.max(1);
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return ResolvedInterval {
            value: default,
            warning: None,
        };
    };

    match raw.parse::<i64>() {
        Ok(value) => ResolvedInterval {
            value: normalize_interval(Some(value), default),
            warning: (value <= 0).then(|| {
                ValidationError::InvalidInterval(format!(
                    "{} is not positive, using {}",
                    value, default
                ))
            }),
        },
        Err(_) => ResolvedInterval {
            value: default,
            warning: Some(ValidationError::InvalidInterval(format!(
                "'{}' is not an integer, using {}",
                raw, default
            ))),
        },
    }
}

/// Normalize an already-parsed interval: anything below 1 becomes `default`
pub fn normalize_interval(value: Option<i64>, default: u64) -> u64 {
    match value {
        Some(v) if v > 0 => v as u64,
        _ => default.max(1),
    }
}

/// Progress of an extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractionEvent {
    /// A selected frame was written
    FrameExtracted { frame: FrameSample },
    /// A selected frame could not be encoded or written; the run continues
    WriteWarning {
        index: usize,
        source_offset: u64,
        reason: String,
    },
    /// The run stopped early (terminal)
    ExtractionFailed { reason: String },
    /// The video was exhausted (terminal)
    ExtractionComplete { total_count: usize },
}

impl ExtractionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExtractionEvent::ExtractionFailed { .. } | ExtractionEvent::ExtractionComplete { .. }
        )
    }

    /// Event name used in progress output
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionEvent::FrameExtracted { .. } => "frame_extracted",
            ExtractionEvent::WriteWarning { .. } => "write_warning",
            ExtractionEvent::ExtractionFailed { .. } => "extraction_failed",
            ExtractionEvent::ExtractionComplete { .. } => "extraction_complete",
        }
    }
}

/// Builds extraction runs against one decoder
#[derive(Clone)]
pub struct FrameExtractor {
    decoder: Arc<dyn VideoDecoder>,
    default_interval: u64,
    jpeg_quality: u8,
}

impl FrameExtractor {
    pub fn new(decoder: Arc<dyn VideoDecoder>) -> Self {
        Self {
            decoder,
            default_interval: DEFAULT_FRAME_INTERVAL,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_default_interval(mut self, interval: u64) -> Self {
        self.default_interval = interval.max(1);
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn default_interval(&self) -> u64 {
        self.default_interval
    }

    /// Create a run. Nothing happens until the first event is requested.
    pub fn extract(
        &self,
        video: &Path,
        store: &FrameStore,
        interval: Option<i64>,
        cancel: CancellationToken,
    ) -> ExtractionRun {
        ExtractionRun {
            video_path: video.to_path_buf(),
            store: store.clone(),
            decoder: Arc::clone(&self.decoder),
            interval: normalize_interval(interval, self.default_interval),
            jpeg_quality: self.jpeg_quality,
            cancel,
            state: RunState::Pending,
        }
    }
}

enum RunState {
    Pending,
    Streaming(OpenVideo),
    Finished,
}

struct OpenVideo {
    stream: Box<dyn VideoStream>,
    source_offset: u64,
    next_index: usize,
}

/// One extraction run; an [`Iterator`] of [`ExtractionEvent`]s
pub struct ExtractionRun {
    video_path: PathBuf,
    store: FrameStore,
    decoder: Arc<dyn VideoDecoder>,
    interval: u64,
    jpeg_quality: u8,
    cancel: CancellationToken,
    state: RunState,
}

impl ExtractionRun {
    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Finished)
    }

    /// Drive the run from a blocking thread, one event per poll
    pub fn into_stream(self) -> ExtractionStream {
        let guard = self.cancel.clone().drop_guard();
        let inner = stream::unfold(Some(self), |run| async move {
            let mut run = run?;
            let (event, run) = tokio::task::spawn_blocking(move || {
                let event = run.next();
                (event, run)
            })
            .await
            .ok()?;
            event.map(|event| (event, Some(run)))
        })
        .boxed();

        ExtractionStream {
            inner,
            _guard: guard,
        }
    }

    fn open(&self) -> Result<Box<dyn VideoStream>, String> {
        self.store.prepare().map_err(|e| e.to_string())?;
        let stream = self.decoder.open(&self.video_path).map_err(|e| e.to_string())?;
        info!(
            video = %self.video_path.display(),
            directory = %self.store.directory().display(),
            interval = self.interval,
            frame_rate = ?stream.frame_rate(),
            "Extraction started"
        );
        Ok(stream)
    }

    fn finish(&mut self) {
        // Dropping the open video releases its handle
        self.state = RunState::Finished;
    }
}

impl Iterator for ExtractionRun {
    type Item = ExtractionEvent;

    fn next(&mut self) -> Option<ExtractionEvent> {
        loop {
            match &mut self.state {
                RunState::Finished => return None,
                RunState::Pending => {
                    if self.cancel.is_cancelled() {
                        self.finish();
                        return None;
                    }
                    match self.open() {
                        Ok(stream) => {
                            self.state = RunState::Streaming(OpenVideo {
                                stream,
                                source_offset: 0,
                                next_index: 0,
                            });
                        }
                        Err(reason) => {
                            warn!(video = %self.video_path.display(), %reason, "Extraction failed to start");
                            self.finish();
                            return Some(ExtractionEvent::ExtractionFailed { reason });
                        }
                    }
                }
                RunState::Streaming(open) => {
                    if self.cancel.is_cancelled() {
                        info!(written = open.next_index, "Extraction cancelled");
                        self.finish();
                        return None;
                    }

                    let image = match open.stream.next_frame() {
                        Ok(Some(image)) => image,
                        Ok(None) => {
                            let total_count = open.next_index;
                            info!(
                                total_count,
                                decoded = open.source_offset,
                                "Extraction complete"
                            );
                            self.finish();
                            return Some(ExtractionEvent::ExtractionComplete { total_count });
                        }
                        Err(e) => {
                            warn!(error = %e, "Extraction aborted by decode error");
                            self.finish();
                            return Some(ExtractionEvent::ExtractionFailed {
                                reason: e.to_string(),
                            });
                        }
                    };

                    let source_offset = open.source_offset;
                    open.source_offset += 1;
                    if source_offset % self.interval != 0 {
                        continue;
                    }
                    if self.cancel.is_cancelled() {
                        continue;
                    }

                    let index = open.next_index;
                    let written = encode_jpeg(&image, self.jpeg_quality, index)
                        .and_then(|bytes| self.store.write(index, &bytes));
                    match written {
                        Ok(path) => {
                            open.next_index += 1;
                            debug!(index, source_offset, path = %path.display(), "Frame extracted");
                            return Some(ExtractionEvent::FrameExtracted {
                                frame: FrameSample::new(index, Some(source_offset), path),
                            });
                        }
                        Err(e) => {
                            warn!(index, source_offset, error = %e, "Frame write failed");
                            return Some(ExtractionEvent::WriteWarning {
                                index,
                                source_offset,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
}

impl Drop for ExtractionRun {
    fn drop(&mut self) {
        if let RunState::Streaming(open) = &self.state {
            debug!(
                video = %self.video_path.display(),
                written = open.next_index,
                "Extraction dropped before completion"
            );
        }
    }
}

/// Async view of an [`ExtractionRun`].
///
/// Each poll advances the run by one event on a blocking thread. Dropping the
/// stream cancels the run.
pub struct ExtractionStream {
    inner: BoxStream<'static, ExtractionEvent>,
    _guard: DropGuard,
}

impl Stream for ExtractionStream {
    type Item = ExtractionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Encode a decoded frame as JPEG
pub fn encode_jpeg(image: &DynamicImage, quality: u8, index: usize) -> Result<Vec<u8>, StorageError> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| StorageError::EncodeFailed {
            index,
            message: e.to_string(),
        })?;
    Ok(bytes)
}
