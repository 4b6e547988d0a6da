use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::crop::{CropRect, FrameRange};
use crate::frames::FrameSourceError;
use crate::ids::EntityKind;

/// Failures reported by album and extraction operations.
#[derive(Debug, Error)]
pub enum AlbumError {
    #[error("{kind} {id} does not exist")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot open video {}: {source}", .path.display())]
    VideoUnreadable {
        path: PathBuf,
        #[source]
        source: FrameSourceError,
    },

    #[error("invalid frame range {0}")]
    InvalidFrameRange(FrameRange),

    #[error("crop region {0} is empty")]
    EmptyCropRegion(CropRect),

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),
}

impl AlbumError {
    pub(crate) fn not_found(kind: EntityKind, id: i64) -> Self {
        AlbumError::NotFound { kind, id }
    }

    pub(crate) fn write_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AlbumError::WriteFailure {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AlbumError>;
