//! Frame storage implementation
//!
//! Owns the on-disk lifecycle of the frame directory for one active video.
//! Frames are stored at paths derived solely from their index so a frame can be
//! located again without consulting any in-memory state.

use crate::error::{StorageError, ValidationError};
use crate::frame::{frame_file_name, parse_frame_index, FrameSample};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Result of removing a single frame file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Index-addressed frame storage
///
/// Layout: `{directory}/frame_{index:05}.jpg`
#[derive(Debug, Clone)]
pub struct FrameStore {
    directory: PathBuf,
}

impl FrameStore {
    /// Create a store rooted at `directory`. Nothing touches the filesystem
    /// until [`FrameStore::prepare`] or [`FrameStore::write`] is called.
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    /// Get the frame directory of this store
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Reset the frame directory for a new extraction run.
    ///
    /// Recursively deletes the directory if it exists, then recreates it empty.
    /// On success the directory exists and contains nothing.
    pub fn prepare(&self) -> Result<(), StorageError> {
        match fs::remove_dir_all(&self.directory) {
            Ok(()) => debug!(directory = %self.directory.display(), "Cleared frame directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::PrepareFailed {
                    path: self.directory.clone(),
                    source: e,
                })
            }
        }

        fs::create_dir_all(&self.directory).map_err(|e| StorageError::PrepareFailed {
            path: self.directory.clone(),
            source: e,
        })
    }

    /// Compute the filesystem path for a frame index
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.directory.join(frame_file_name(index))
    }

    /// Persist one encoded frame at the path derived from `index`.
    ///
    /// Writes to a `.tmp` sibling and renames it into place, so a reader never
    /// observes a half-written frame.
    pub fn write(&self, index: usize, image_bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let frame_path = self.frame_path(index);
        let temp_path = frame_path.with_extension("jpg.tmp");

        fs::write(&temp_path, image_bytes).map_err(|e| StorageError::WriteFailed {
            index,
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, &frame_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::WriteFailed {
                index,
                path: frame_path.clone(),
                source: e,
            }
        })?;

        Ok(frame_path)
    }

    /// Read a persisted frame back into memory
    pub fn read(path: &Path) -> Result<Vec<u8>, StorageError> {
        fs::read(path).map_err(|e| StorageError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Delete one frame file.
    ///
    /// A file that is already absent is not an error.
    pub fn remove(path: &Path) -> Result<RemoveOutcome, StorageError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(RemoveOutcome::Removed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RemoveOutcome::NotFound),
            Err(e) => Err(StorageError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// List frames currently on disk, sorted by index.
    ///
    /// Files that do not follow the frame naming scheme are ignored. A missing
    /// directory lists as empty.
    pub fn list(&self) -> Result<Vec<FrameSample>, StorageError> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let mut frames = Vec::new();
        for entry in WalkDir::new(&self.directory).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                StorageError::IoError(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(ErrorKind::Other, "directory walk failed")
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(index) = parse_frame_index(entry.path()) {
                frames.push(FrameSample::new(index, None, entry.path().to_path_buf()));
            }
        }
        frames.sort_by_key(|frame| frame.index);
        Ok(frames)
    }

    /// Resolve a caller-supplied frame name to a path inside the frame directory.
    ///
    /// Only bare file names following the `frame_{index:05}.jpg` scheme are
    /// accepted. Separators, parent references, roots and foreign file names
    /// are rejected.
    pub fn resolve_name(&self, name: &str) -> Result<PathBuf, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidFrameName(
                "frame name cannot be empty".to_string(),
            ));
        }
        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(ValidationError::InvalidFrameName(format!(
                "'{}' must be a bare file name",
                name
            )));
        }
        let mut components = Path::new(trimmed).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(ValidationError::InvalidFrameName(format!(
                    "'{}' must be a bare file name",
                    name
                )))
            }
        }

        match parse_frame_index(Path::new(trimmed)) {
            Some(index) if frame_file_name(index) == trimmed => Ok(self.frame_path(index)),
            _ => Err(ValidationError::InvalidFrameName(format!(
                "'{}' is not a frame file name",
                name
            ))),
        }
    }
}
