//! Frame ranges, crop rectangles and generated image names.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AlbumError, Result};

/// Pixel rectangle with exclusive right/bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl CropRect {
    pub fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The whole frame of a `width` x `height` source.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, i64::from(width), i64::from(height))
    }

    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn intersect(&self, other: &CropRect) -> CropRect {
        CropRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// The region actually cropped from a `width` x `height` source: the
/// requested rectangle clamped to the frame, or the whole frame.
pub fn effective_rect(requested: Option<CropRect>, width: u32, height: u32) -> Result<CropRect> {
    let full = CropRect::full(width, height);
    let rect = match requested {
        Some(rect) => full.intersect(&rect),
        None => full,
    };
    if rect.is_empty() {
        return Err(AlbumError::EmptyCropRegion(rect));
    }
    Ok(rect)
}

/// Frames `start, start + step, ...` below `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl FrameRange {
    pub fn new(start: i64, end: i64, step: i64) -> Self {
        Self { start, end, step }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start < 0 || self.step < 1 {
            return Err(AlbumError::InvalidFrameRange(*self));
        }
        Ok(())
    }

    /// Same range with `end` limited to the frames the source actually has.
    pub fn clamped(&self, frame_count: u64) -> FrameRange {
        let available = i64::try_from(frame_count).unwrap_or(i64::MAX);
        FrameRange {
            end: self.end.min(available),
            ..*self
        }
    }

    /// Sampled frame indices. Invalid ranges yield nothing.
    pub fn indices(&self) -> impl Iterator<Item = i64> {
        let valid = self.start >= 0 && self.step >= 1;
        let start = self.start;
        let end = if valid { self.end.max(start) } else { start };
        let step = usize::try_from(self.step).unwrap_or(1).max(1);
        (start..end).step_by(step)
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) step {}", self.start, self.end, self.step)
    }
}

/// Sortable name for a generated image, before namespace disambiguation.
pub fn image_file_name(video_id: i64, frame_index: i64, rect: &CropRect, extension: &str) -> String {
    format!(
        "{:06}_{:08}_{:04},{:04},{:04},{:04}.{}",
        video_id, frame_index, rect.left, rect.top, rect.right, rect.bottom, extension
    )
}
