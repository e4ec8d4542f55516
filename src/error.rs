//! Error types for the Minewatch frame extraction and analysis pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Filesystem errors raised by the frame store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to prepare frame directory {path:?}: {source}")]
    PrepareFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write frame {index} to {path:?}: {source}")]
    WriteFailed {
        index: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove frame {path:?}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read frame {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode frame {index}: {message}")]
    EncodeFailed { index: usize, message: String },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Video decoding errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unable to open video file {path:?}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    #[error("Failed to decode frame at offset {offset}: {message}")]
    DecodeFailed { offset: u64, message: String },

    #[error("Video decoding is not available: {0}")]
    DecoderUnavailable(String),
}

/// Remote inference errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider request timed out: {0}")]
    Timeout(String),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Provider model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Nothing to summarize: {0}")]
    NothingToSummarize(String),

    #[error("Failed to load frame image: {0}")]
    FrameUnreadable(#[from] StorageError),
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid frame interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid request format. Expected {{\"frames\": [...]}}: {0}")]
    InvalidRemovalRequest(String),

    #[error("No frames specified for removal.")]
    EmptyRemovalRequest,

    #[error("Invalid frame name: {0}")]
    InvalidFrameName(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors surfaced to callers of the session API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No frames available for analysis. Extract frames first.")]
    NoFramesExtracted,

    #[error("No analysis results available. Run the analysis first.")]
    NoAnalysis,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
