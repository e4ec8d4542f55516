//! Video Decoding
//!
//! A decoder opens a video path into a stream of decoded still images in
//! presentation order. The stream owns the underlying handle and releases it
//! when dropped, so every exit path of an extraction run closes the video.

use crate::error::ExtractionError;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

/// Opens video sources
pub trait VideoDecoder: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoStream>, ExtractionError>;
}

/// An open video. Dropping it releases the handle.
pub trait VideoStream: Send {
    /// Decode the next frame; `Ok(None)` at end of stream
    fn next_frame(&mut self) -> Result<Option<DynamicImage>, ExtractionError>;

    /// Nominal frame rate, when the container reports one
    fn frame_rate(&self) -> Option<f64> {
        None
    }
}

/// Decoder compiled into this build.
///
/// Without the `ffmpeg` feature there is no decoder and this fails with
/// [`ExtractionError::DecoderUnavailable`].
pub fn default_decoder() -> Result<Arc<dyn VideoDecoder>, ExtractionError> {
    #[cfg(feature = "ffmpeg")]
    {
        Ok(Arc::new(ffmpeg::FfmpegDecoder::new()?))
    }
    #[cfg(not(feature = "ffmpeg"))]
    {
        Err(ExtractionError::DecoderUnavailable(
            "minewatch was built without the `ffmpeg` feature".to_string(),
        ))
    }
}

/// Decoder used when none is compiled in; every open fails with the reason
pub struct UnavailableDecoder {
    reason: String,
}

impl UnavailableDecoder {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl VideoDecoder for UnavailableDecoder {
    fn open(&self, _path: &Path) -> Result<Box<dyn VideoStream>, ExtractionError> {
        Err(ExtractionError::DecoderUnavailable(self.reason.clone()))
    }
}
