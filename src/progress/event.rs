//! Event schema for progress observability.

use crate::analysis::{AnalysisStats, FrameAnalysis};
use crate::frame::FrameSample;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SESSION_STARTED: &str = "session_started";
pub const SESSION_ENDED: &str = "session_ended";
pub const FRAME_ANALYZED: &str = "frame_analyzed";
pub const ANALYSIS_COMPLETE: &str = "analysis_complete";
pub const SUMMARY_GENERATED: &str = "summary_generated";
pub const FRAMES_REMOVED: &str = "frames_removed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub ts: String,
    pub session: String,
    pub seq: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct ProgressEnvelope {
    pub ts: String,
    pub session: String,
    pub event_type: String,
    pub data: Value,
}

impl ProgressEnvelope {
    pub fn with_now(session: impl Into<String>, event_type: impl Into<String>, data: Value) -> Self {
        Self {
            ts: crate::progress::session::now_millis().to_string(),
            session: session.into(),
            event_type: event_type.into(),
            data,
        }
    }
}

impl ProgressEvent {
    pub fn from_envelope(envelope: ProgressEnvelope, seq: u64) -> Self {
        Self {
            ts: envelope.ts,
            session: envelope.session,
            seq,
            event_type: envelope.event_type,
            data: envelope.data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartedData {
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEndedData {
    pub status: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameAnalyzedData {
    pub frame: FrameSample,
    pub analysis: FrameAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCompleteData {
    #[serde(flatten)]
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEventData {
    pub frame_count: usize,
    pub observation_count: usize,
    pub model: String,
}
