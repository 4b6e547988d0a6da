//! Decoder and writer doubles used by the unit tests.

use image::{ImageError, ImageFormat, Rgb, RgbImage};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::frames::{FrameSource, FrameSourceError, ImageWriter, VideoDecoder};

/// Files starting with this marker are treated as playable videos.
pub const VIDEO_MAGIC: &[u8] = b"SYNTHETIC VIDEO";

pub fn write_video(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, VIDEO_MAGIC).unwrap();
    path
}

/// Shared view of what the decoder was asked to do.
#[derive(Debug, Default)]
pub struct DecoderState {
    open: Cell<usize>,
    opened: Cell<usize>,
    reads: RefCell<Vec<u64>>,
}

impl DecoderState {
    /// Handles opened and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open.get()
    }

    pub fn opened(&self) -> usize {
        self.opened.get()
    }

    pub fn reads(&self) -> Vec<u64> {
        self.reads.borrow().clone()
    }
}

/// Produces frames whose pixel at `(x, y)` is `[index, x, y]`.
pub struct SyntheticDecoder {
    width: u32,
    height: u32,
    frame_count: u64,
    unreadable: HashSet<u64>,
    pub state: Rc<DecoderState>,
}

impl SyntheticDecoder {
    pub fn new(width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            width,
            height,
            frame_count,
            unreadable: HashSet::new(),
            state: Rc::new(DecoderState::default()),
        }
    }

    pub fn with_unreadable(mut self, frames: impl IntoIterator<Item = u64>) -> Self {
        self.unreadable.extend(frames);
        self
    }
}

impl VideoDecoder for SyntheticDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, FrameSourceError> {
        let bytes = fs::read(path).map_err(|source| FrameSourceError::Spawn {
            program: "synthetic".to_string(),
            source,
        })?;
        if !bytes.starts_with(VIDEO_MAGIC) {
            return Err(FrameSourceError::NoVideoStream);
        }

        self.state.open.set(self.state.open.get() + 1);
        self.state.opened.set(self.state.opened.get() + 1);
        Ok(Box::new(SyntheticSource {
            width: self.width,
            height: self.height,
            frame_count: self.frame_count,
            unreadable: self.unreadable.clone(),
            state: Rc::clone(&self.state),
        }))
    }
}

struct SyntheticSource {
    width: u32,
    height: u32,
    frame_count: u64,
    unreadable: HashSet<u64>,
    state: Rc<DecoderState>,
}

impl FrameSource for SyntheticSource {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> Option<f64> {
        Some(25.0)
    }

    fn read_frame_at(&mut self, index: u64) -> Option<RgbImage> {
        self.state.reads.borrow_mut().push(index);
        if index >= self.frame_count || self.unreadable.contains(&index) {
            return None;
        }
        Some(RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([index as u8, x as u8, y as u8])
        }))
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.state.open.set(self.state.open.get() - 1);
    }
}

/// PNG writer that fails on chosen calls (0-based), leaving a partial file.
#[derive(Debug, Default)]
pub struct ScriptedWriter {
    fail_on_call: HashSet<usize>,
    calls: Cell<usize>,
}

impl ScriptedWriter {
    pub fn failing_on(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on_call: calls.into_iter().collect(),
            calls: Cell::new(0),
        }
    }
}

impl ImageWriter for ScriptedWriter {
    fn extension(&self) -> &str {
        "png"
    }

    fn write(&self, image: &RgbImage, path: &Path) -> image::ImageResult<()> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if self.fail_on_call.contains(&call) {
            // Leave a truncated file behind, as a full disk would.
            fs::write(path, b"partial").map_err(ImageError::IoError)?;
            return Err(ImageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            )));
        }
        image.save_with_format(path, ImageFormat::Png)
    }
}
