//! FFmpeg-backed video decoder
//!
//! FFmpeg contexts are not `Send`. Each open video owns a decode thread that
//! holds the contexts for their whole life; the [`FfmpegStream`] handle asks
//! that thread for one frame at a time over channels.

use crate::error::ExtractionError;
use crate::video::{VideoDecoder, VideoStream};
use ffmpeg_next as ffmpeg;
use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info};

type DecodeResult = Result<Option<DynamicImage>, ExtractionError>;

/// Decoder using the system FFmpeg libraries
pub struct FfmpegDecoder;

impl FfmpegDecoder {
    pub fn new() -> Result<Self, ExtractionError> {
        ffmpeg::init().map_err(|e| {
            ExtractionError::DecoderUnavailable(format!("Failed to initialize FFmpeg: {}", e))
        })?;
        Ok(Self)
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoStream>, ExtractionError> {
        Ok(Box::new(FfmpegStream::open(path)?))
    }
}

/// Handle to one open video
///
/// Dropping the handle stops the decode thread and waits for it, so the file
/// is closed once the drop returns.
pub struct FfmpegStream {
    path: PathBuf,
    fps: f64,
    frames_read: u64,
    requests: Option<mpsc::Sender<()>>,
    frames: mpsc::Receiver<DecodeResult>,
    worker: Option<thread::JoinHandle<()>>,
}

impl FfmpegStream {
    fn open(path: &Path) -> Result<Self, ExtractionError> {
        let open_failed = |message: String| ExtractionError::OpenFailed {
            path: path.to_path_buf(),
            message,
        };

        let (opened_tx, opened_rx) = mpsc::channel();
        let (request_tx, request_rx) = mpsc::channel::<()>();
        let (frame_tx, frame_rx) = mpsc::channel();
        let video = path.to_path_buf();

        let worker = thread::Builder::new()
            .name("ffmpeg-decode".to_string())
            .spawn(move || {
                let mut reader = match FrameReader::open(&video) {
                    Ok(reader) => {
                        let _ = opened_tx.send(Ok(reader.fps));
                        reader
                    }
                    Err(e) => {
                        let _ = opened_tx.send(Err(e));
                        return;
                    }
                };
                while request_rx.recv().is_ok() {
                    if frame_tx.send(reader.next_frame()).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| open_failed(format!("failed to start decode thread: {}", e)))?;

        let fps = match opened_rx.recv() {
            Ok(Ok(fps)) => fps,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(open_failed("decode thread exited".to_string()));
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            fps,
            frames_read: 0,
            requests: Some(request_tx),
            frames: frame_rx,
            worker: Some(worker),
        })
    }
}

impl VideoStream for FfmpegStream {
    fn next_frame(&mut self) -> DecodeResult {
        let offset = self.frames_read;
        let disconnected = move || ExtractionError::DecodeFailed {
            offset,
            message: "decode thread exited".to_string(),
        };

        let requests = self.requests.as_ref().ok_or_else(disconnected)?;
        requests.send(()).map_err(|_| disconnected())?;
        let frame = self.frames.recv().map_err(|_| disconnected())??;
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    fn frame_rate(&self) -> Option<f64> {
        (self.fps.is_finite() && self.fps > 0.0).then_some(self.fps)
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        // Closing the request channel ends the decode loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        debug!(
            video = %self.path.display(),
            frames_read = self.frames_read,
            "Closed video"
        );
    }
}

/// FFmpeg contexts for one video. Lives only on its decode thread.
struct FrameReader {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    fps: f64,
    frames_read: u64,
    eof_sent: bool,
}

impl FrameReader {
    fn open(path: &Path) -> Result<Self, ExtractionError> {
        let open_failed = |message: String| ExtractionError::OpenFailed {
            path: path.to_path_buf(),
            message,
        };

        let input = ffmpeg::format::input(&path).map_err(|e| open_failed(e.to_string()))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| open_failed("no video stream found".to_string()))?;
        let stream_index = stream.index();
        let fps: f64 = stream.avg_frame_rate().into();

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_failed(format!("failed to create codec context: {}", e)))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| open_failed(format!("failed to create video decoder: {}", e)))?;

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| open_failed(format!("failed to create scaler: {}", e)))?;

        info!(
            video = %path.display(),
            width = decoder.width(),
            height = decoder.height(),
            fps,
            "Opened video"
        );

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            fps,
            frames_read: 0,
            eof_sent: false,
        })
    }

    fn decode_failed(&self, message: String) -> ExtractionError {
        ExtractionError::DecodeFailed {
            offset: self.frames_read,
            message,
        }
    }

    fn to_image(&mut self, decoded: &ffmpeg::frame::Video) -> Result<DynamicImage, ExtractionError> {
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .map_err(|e| self.decode_failed(format!("failed to scale frame: {}", e)))?;

        let width = rgb.width();
        let height = rgb.height();
        let stride = rgb.stride(0);
        let row_len = width as usize * 3;
        let data = rgb.data(0);

        // Rows may be padded past width * 3
        let mut pixels = Vec::with_capacity(row_len * height as usize);
        for row in data.chunks(stride).take(height as usize) {
            pixels.extend_from_slice(&row[..row_len]);
        }

        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| self.decode_failed("frame buffer has unexpected size".to_string()))?;
        Ok(DynamicImage::ImageRgb8(image))
    }

    fn next_frame(&mut self) -> DecodeResult {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let image = self.to_image(&decoded)?;
                self.frames_read += 1;
                return Ok(Some(image));
            }
            if self.eof_sent {
                return Ok(None);
            }

            let next = self
                .input
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            match next {
                Some((index, packet)) if index == self.stream_index => {
                    self.decoder
                        .send_packet(&packet)
                        .map_err(|e| self.decode_failed(e.to_string()))?;
                }
                Some(_) => {}
                None => {
                    // Flush frames still buffered in the decoder
                    self.decoder
                        .send_eof()
                        .map_err(|e| self.decode_failed(e.to_string()))?;
                    self.eof_sent = true;
                }
            }
        }
    }
}
