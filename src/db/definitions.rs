//! Crop definition rows.

use rusqlite::Row;
use serde::Serialize;

use crate::crop::{CropRect, FrameRange};

/// A crop recipe for one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CropDefinition {
    pub id: i64,
    pub video_id: i64,
    pub description: String,
    /// Set once extraction has completed; never cleared.
    pub done: bool,
    pub range: FrameRange,
    /// `None` crops the full frame.
    pub rect: Option<CropRect>,
    pub added_at: String,
}

pub(crate) const COLUMNS: &str = "id, video_id, description, done, index_start, index_end, index_step, \
     pixel_left, pixel_top, pixel_right, pixel_bottom, added_at";

impl CropDefinition {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let left: Option<i64> = row.get(7)?;
        let top: Option<i64> = row.get(8)?;
        let right: Option<i64> = row.get(9)?;
        let bottom: Option<i64> = row.get(10)?;
        let rect = match (left, top, right, bottom) {
            (Some(left), Some(top), Some(right), Some(bottom)) => {
                Some(CropRect::new(left, top, right, bottom))
            }
            _ => None,
        };

        Ok(Self {
            id: row.get(0)?,
            video_id: row.get(1)?,
            description: row.get(2)?,
            done: row.get(3)?,
            range: FrameRange::new(row.get(4)?, row.get(5)?, row.get(6)?),
            rect,
            added_at: row.get(11)?,
        })
    }
}
