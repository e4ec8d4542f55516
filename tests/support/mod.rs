//! Test doubles shared by the integration and property suites: a scripted
//! model provider and an in-memory video decoder.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use minewatch::error::{ExtractionError, InferenceError};
use minewatch::frame::frame_file_name;
use minewatch::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, TokenUsage,
};
use minewatch::video::{VideoDecoder, VideoStream};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Which pipeline step a request belongs to, judged from the default prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Relevance,
    Category,
    Summary,
}

impl PromptKind {
    pub fn of(messages: &[ChatMessage]) -> Self {
        let user = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        if user.ends_with("Is this image of a mining site?") {
            PromptKind::Relevance
        } else if user.starts_with("Summarize the following analyses") {
            PromptKind::Summary
        } else {
            PromptKind::Category
        }
    }
}

/// One recorded request
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: PromptKind,
    pub messages: Vec<ChatMessage>,
    pub options: CompletionOptions,
}

type Script = dyn Fn(PromptKind, &[ChatMessage], usize) -> Result<String, InferenceError> + Send + Sync;

/// Model provider answering from a closure. The closure receives the prompt
/// kind, the messages and the number of earlier calls of the same kind.
pub struct ScriptedProvider {
    script: Box<Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(PromptKind, &[ChatMessage], usize) -> Result<String, InferenceError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every frame relevant; category answers name the category prompt
    pub fn all_relevant() -> Self {
        Self::new(|kind, messages, _| match kind {
            PromptKind::Relevance => Ok("Yes".to_string()),
            PromptKind::Category => Ok(format!(
                "observed: {}",
                messages.last().map(|m| m.content.as_str()).unwrap_or_default()
            )),
            PromptKind::Summary => Ok("Overall the site is stable.".to_string()),
        })
    }

    /// Relevance answers taken in order from `answers`; later frames are relevant
    pub fn with_relevance(answers: Vec<&'static str>) -> Self {
        Self::new(move |kind, _, nth| match kind {
            PromptKind::Relevance => Ok(answers.get(nth).copied().unwrap_or("yes").to_string()),
            PromptKind::Category => Ok("  Haul trucks active.  ".to_string()),
            PromptKind::Summary => Ok("Conclusion.".to_string()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, kind: PromptKind) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }
}

#[async_trait]
impl ModelProviderClient for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, InferenceError> {
        let kind = PromptKind::of(&messages);
        let nth = {
            let mut calls = self.calls.lock();
            let nth = calls.iter().filter(|c| c.kind == kind).count();
            calls.push(RecordedCall {
                kind,
                messages: messages.clone(),
                options,
            });
            nth
        };
        let content = (self.script)(kind, &messages, nth)?;
        Ok(CompletionResponse {
            content,
            model: "scripted-vision".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-vision"
    }
}

/// Shared observations of a [`FakeDecoder`]
#[derive(Default)]
pub struct DecoderProbe {
    pub opened: AtomicUsize,
    pub decoded: AtomicUsize,
    pub released: AtomicBool,
}

impl DecoderProbe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn decoded(&self) -> usize {
        self.decoded.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Decoder producing `frames` small solid images for any existing path.
///
/// `fail_writes` names selected-frame ordinals (0 for the first frame kept by
/// the stride) whose write must fail. The stream blocks the target file name
/// with a directory just before handing out such a frame and removes the
/// block on the following decode.
pub struct FakeDecoder {
    pub frames: u64,
    pub decode_error_at: Option<u64>,
    pub interval: u64,
    pub frames_dir: Option<PathBuf>,
    pub fail_writes: BTreeSet<u64>,
    pub probe: Arc<DecoderProbe>,
}

impl FakeDecoder {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            decode_error_at: None,
            interval: 1,
            frames_dir: None,
            fail_writes: BTreeSet::new(),
            probe: Arc::new(DecoderProbe::default()),
        }
    }

    pub fn with_decode_error_at(mut self, offset: u64) -> Self {
        self.decode_error_at = Some(offset);
        self
    }

    pub fn with_write_failures(
        mut self,
        frames_dir: impl Into<PathBuf>,
        interval: u64,
        ordinals: impl IntoIterator<Item = u64>,
    ) -> Self {
        self.frames_dir = Some(frames_dir.into());
        self.interval = interval.max(1);
        self.fail_writes = ordinals.into_iter().collect();
        self
    }

    pub fn probe(&self) -> Arc<DecoderProbe> {
        Arc::clone(&self.probe)
    }
}

impl VideoDecoder for FakeDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoStream>, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::OpenFailed {
                path: path.to_path_buf(),
                message: "No such file or directory".to_string(),
            });
        }
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            total: self.frames,
            offset: 0,
            decode_error_at: self.decode_error_at,
            interval: self.interval,
            frames_dir: self.frames_dir.clone(),
            fail_writes: self.fail_writes.clone(),
            blocker: None,
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct FakeStream {
    total: u64,
    offset: u64,
    decode_error_at: Option<u64>,
    interval: u64,
    frames_dir: Option<PathBuf>,
    fail_writes: BTreeSet<u64>,
    blocker: Option<PathBuf>,
    probe: Arc<DecoderProbe>,
}

impl FakeStream {
    fn clear_blocker(&mut self) {
        if let Some(blocker) = self.blocker.take() {
            let _ = std::fs::remove_dir(blocker);
        }
    }

    fn block_if_scripted(&mut self) {
        let Some(dir) = self.frames_dir.clone() else {
            return;
        };
        if self.offset % self.interval != 0 {
            return;
        }
        let ordinal = self.offset / self.interval;
        if !self.fail_writes.contains(&ordinal) {
            return;
        }
        // A failed write does not consume its index
        let earlier_failures = self.fail_writes.range(..ordinal).count() as u64;
        let index = (ordinal - earlier_failures) as usize;
        let blocker = dir.join(frame_file_name(index));
        if std::fs::create_dir(&blocker).is_ok() {
            self.blocker = Some(blocker);
        }
    }
}

impl VideoStream for FakeStream {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>, ExtractionError> {
        self.clear_blocker();
        if self.decode_error_at == Some(self.offset) {
            return Err(ExtractionError::DecodeFailed {
                offset: self.offset,
                message: "corrupt packet".to_string(),
            });
        }
        if self.offset >= self.total {
            return Ok(None);
        }
        self.block_if_scripted();
        let shade = (self.offset % 255) as u8;
        self.offset += 1;
        self.probe.decoded.fetch_add(1, Ordering::SeqCst);
        Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            8,
            8,
            image::Rgb([shade, 128, 64]),
        ))))
    }

    fn frame_rate(&self) -> Option<f64> {
        Some(30.0)
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.clear_blocker();
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

/// Placeholder video file the fake decoder accepts
pub fn touch_video(dir: &Path) -> PathBuf {
    let path = dir.join("site.mp4");
    std::fs::write(&path, b"not really a video").expect("write video stub");
    path
}

/// Configuration rooted in `dir`, with frames under `dir/frames`
pub fn test_config(dir: &Path) -> minewatch::config::MinewatchConfig {
    let mut config = minewatch::config::MinewatchConfig::default();
    config.extraction.frames_dir = dir.join("frames");
    config
}

/// Session over `dir/frames` using the given doubles
pub fn site_session(
    dir: &Path,
    provider: Arc<dyn ModelProviderClient>,
    decoder: Arc<dyn VideoDecoder>,
) -> minewatch::session::SiteSession {
    minewatch::session::SiteSession::from_config(&test_config(dir), provider, decoder)
}
