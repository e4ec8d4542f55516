//! Extracted Frames
//!
//! A frame sample is one still image persisted by an extraction run. Its index is
//! assigned only to frames that pass the stride filter, so indices are contiguous
//! from zero and the file path is a pure function of the index.

pub mod storage;

pub use storage::{FrameStore, RemoveOutcome};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name prefix shared by every persisted frame
pub const FRAME_FILE_PREFIX: &str = "frame_";

/// File extension of persisted frames
pub const FRAME_FILE_EXTENSION: &str = "jpg";

/// One persisted frame of an extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Position among selected frames (0-based, no gaps)
    pub index: usize,
    /// Ordinal position in the raw decode stream; unknown for frames adopted
    /// from a directory written by an earlier process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_offset: Option<u64>,
    /// Deterministic location derived from `index`
    pub file_path: PathBuf,
}

impl FrameSample {
    pub fn new(index: usize, source_offset: Option<u64>, file_path: PathBuf) -> Self {
        Self {
            index,
            source_offset,
            file_path,
        }
    }

    /// Bare file name, e.g. `frame_00003.jpg`
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| frame_file_name(self.index))
    }

    /// Short label used in prompts and summaries, e.g. `frame_00003`
    pub fn label(&self) -> String {
        format!("{}{:05}", FRAME_FILE_PREFIX, self.index)
    }
}

/// File name for a frame index: `frame_{index:05}.jpg`
pub fn frame_file_name(index: usize) -> String {
    format!("{}{:05}.{}", FRAME_FILE_PREFIX, index, FRAME_FILE_EXTENSION)
}

/// Recover the index from a frame path produced by [`frame_file_name`].
///
/// Returns `None` for anything that does not follow the naming scheme.
pub fn parse_frame_index(path: &Path) -> Option<usize> {
    if path.extension()?.to_str()? != FRAME_FILE_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(FRAME_FILE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
