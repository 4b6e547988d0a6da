//! Video decoding and still-image encoding seams.
//!
//! The crop engine only ever talks to [`VideoDecoder`], [`FrameSource`] and
//! [`ImageWriter`]. The shipped implementations shell out to ffmpeg for
//! decoding and use the `image` crate for encoding.

pub mod ffmpeg;
pub mod writer;

use image::RgbImage;
use serde::Serialize;
use std::io;
use std::path::Path;
use thiserror::Error;

pub use ffmpeg::FfmpegDecoder;
pub use writer::CodecWriter;

#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("no video stream")]
    NoVideoStream,

    #[error("unexpected probe output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An opened video. Dropping it releases the underlying decoder.
pub trait FrameSource {
    fn frame_count(&self) -> u64;

    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    fn frame_rate(&self) -> Option<f64> {
        None
    }

    /// Decode frame `index`. `None` means this frame could not be decoded;
    /// callers skip it rather than abort.
    fn read_frame_at(&mut self, index: u64) -> Option<RgbImage>;
}

pub trait VideoDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, FrameSourceError>;
}

/// Writes cropped frames in a single configured still-image format.
pub trait ImageWriter {
    /// File extension, without the dot, of the files this writer produces.
    fn extension(&self) -> &str;

    fn write(&self, image: &RgbImage, path: &Path) -> image::ImageResult<()>;
}

/// Stream properties of a catalogued video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
    pub frame_rate: Option<f64>,
}

impl VideoInfo {
    pub fn from_source(source: &dyn FrameSource) -> Self {
        let (width, height) = source.dimensions();
        Self {
            width,
            height,
            frame_count: source.frame_count(),
            frame_rate: source.frame_rate(),
        }
    }
}
