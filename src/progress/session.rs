//! Session lifecycle helpers for progress observability.
//!
//! A [`ProgressRecorder`] stamps every event with the command session id, a
//! monotonically increasing sequence number and a millisecond timestamp, then
//! hands it to a [`ProgressSink`].

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::analysis::{AnalysisStats, ConclusionReport, FrameAnalysis};
use crate::extraction::ExtractionEvent;
use crate::frame::FrameSample;
use crate::progress::event::{
    AnalysisCompleteData, FrameAnalyzedData, ProgressEnvelope, ProgressEvent,
    SessionEndedData, SessionStartedData, SummaryEventData, ANALYSIS_COMPLETE, FRAMES_REMOVED,
    FRAME_ANALYZED, SESSION_ENDED, SESSION_STARTED, SUMMARY_GENERATED,
};
use crate::session::RemovalReport;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Interrupted => "interrupted",
        }
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn new_session_id() -> String {
    let ts = now_millis();
    let pid = std::process::id();
    let seq = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("sess-{ts}-{pid}-{seq}")
}

/// Destination for progress events
pub trait ProgressSink: Send + Sync {
    fn write_event(&self, event: &ProgressEvent) -> std::io::Result<()>;
}

/// Writes one JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> ProgressSink for JsonLinesSink<W> {
    fn write_event(&self, event: &ProgressEvent) -> std::io::Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, event)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Keeps events in memory
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }
}

impl ProgressSink for MemorySink {
    fn write_event(&self, event: &ProgressEvent) -> std::io::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Emits the progress events of one command session
pub struct ProgressRecorder {
    session_id: String,
    started_at_ms: u64,
    next_seq: AtomicU64,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressRecorder {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            session_id: new_session_id(),
            started_at_ms: now_millis(),
            next_seq: AtomicU64::new(1),
            sink,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Emit one event; sink failures are logged, never propagated
    pub fn emit(&self, event_type: &str, data: Value) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let envelope = ProgressEnvelope::with_now(self.session_id.clone(), event_type, data);
        let event = ProgressEvent::from_envelope(envelope, seq);
        if let Err(err) = self.sink.write_event(&event) {
            warn!(
                session_id = %self.session_id,
                event_type = %event_type,
                error = %err,
                "failed to emit progress event"
            );
        }
    }

    fn emit_data<T: Serialize>(&self, event_type: &str, data: &T) {
        match serde_json::to_value(data) {
            Ok(value) => self.emit(event_type, value),
            Err(err) => warn!(event_type = %event_type, error = %err, "unserializable progress data"),
        }
    }

    pub fn start(&self, command: &str) {
        self.emit_data(
            SESSION_STARTED,
            &SessionStartedData {
                command: command.to_string(),
            },
        );
    }

    pub fn finish(&self, status: SessionStatus, error: Option<String>) {
        self.emit_data(
            SESSION_ENDED,
            &SessionEndedData {
                status: status.as_str().to_string(),
                duration_ms: now_millis().saturating_sub(self.started_at_ms),
                error,
            },
        );
    }

    /// Extraction events keep their own snake_case names
    pub fn extraction(&self, event: &ExtractionEvent) {
        self.emit_data(event.kind(), event);
    }

    pub fn frame_analyzed(&self, frame: &FrameSample, analysis: &FrameAnalysis) {
        self.emit_data(
            FRAME_ANALYZED,
            &FrameAnalyzedData {
                frame: frame.clone(),
                analysis: analysis.clone(),
            },
        );
    }

    pub fn analysis_complete(&self, stats: AnalysisStats) {
        self.emit_data(ANALYSIS_COMPLETE, &AnalysisCompleteData { stats });
    }

    pub fn summary(&self, report: &ConclusionReport) {
        self.emit_data(
            SUMMARY_GENERATED,
            &SummaryEventData {
                frame_count: report.frame_count,
                observation_count: report.observation_count,
                model: report.model.clone(),
            },
        );
    }

    pub fn frames_removed(&self, report: &RemovalReport) {
        self.emit_data(FRAMES_REMOVED, report);
    }
}
