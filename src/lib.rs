//! videoknife keeps an album of videos and the still images cut from them.
//!
//! An [`Album`] owns a video directory, an image directory and a SQLite
//! catalog. Crop definitions describe which frames of a video to extract
//! and which rectangle of each frame to keep; [`Album::do_crop`] turns a
//! definition into catalogued image files.

pub mod album;
pub mod config;
pub mod crop;
pub mod db;
pub mod error;
pub mod export;
pub mod frames;
pub mod ids;
pub mod logging;
pub mod naming;

#[cfg(test)]
mod testing;

pub use album::{Album, CropReport, ImportReport};
pub use error::{AlbumError, Result};
