//! Progress observability primitives.

pub mod event;
pub mod session;

pub use event::{
    AnalysisCompleteData,
    FrameAnalyzedData,
    ProgressEnvelope,
    ProgressEvent,
    SessionEndedData,
    SessionStartedData,
    SummaryEventData,
};
pub use session::{
    new_session_id,
    now_millis,
    JsonLinesSink,
    MemorySink,
    ProgressRecorder,
    ProgressSink,
    SessionStatus,
};
