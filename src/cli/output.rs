//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain errors to the message shown on stderr
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::NoFramesExtracted | ApiError::NoAnalysis => e.to_string(),
        ApiError::Validation(inner) => inner.to_string(),
        other => format!("error: {}", other),
    }
}
