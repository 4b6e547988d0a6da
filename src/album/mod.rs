//! The album: one video directory, one image directory and one catalog.
//!
//! ```text
//! <root>/
//! ├── video/        imported source videos
//! ├── image/        extracted stills
//! └── catalog.db
//! ```
//!
//! Every mutating operation runs in its own catalog transaction. File
//! writes happen before the commit and are undone if it fails; file
//! deletions happen after the commit, so a crash can leave an orphaned file
//! but never a row pointing at a missing one.

mod import;

pub use import::ImportReport;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::crop::{CropEngine, CropOutcome, CropRect, FrameRange};
use crate::db::{timestamp, Catalog, CatalogRead, CatalogTx, CropDefinition, Image, Video};
use crate::error::{AlbumError, Result};
use crate::frames::{CodecWriter, FfmpegDecoder, ImageWriter, VideoDecoder, VideoInfo};
use crate::ids::{EntityKind, IdAllocator};
use crate::naming::{resolve_unique_name, Namespace};

pub const CATALOG_FILE: &str = "catalog.db";

/// Outcome of [`Album::do_crop_all`].
#[derive(Debug, Default)]
pub struct CropReport {
    pub completed: Vec<(i64, CropOutcome)>,
    pub failed: Vec<(i64, AlbumError)>,
}

impl CropReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Album {
    root: PathBuf,
    video_dir: PathBuf,
    image_dir: PathBuf,
    catalog: Catalog,
    ids: IdAllocator,
    decoder: Box<dyn VideoDecoder>,
    writer: Box<dyn ImageWriter>,
}

impl Album {
    /// Open the album at `root`, creating it if needed, with the ffmpeg
    /// decoder and the configured image codec.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        Self::with_backends(
            root,
            Box::new(FfmpegDecoder::new(&config.decoder)),
            Box::new(CodecWriter::new(&config.extraction)),
        )
    }

    pub fn with_backends(
        root: &Path,
        decoder: Box<dyn VideoDecoder>,
        writer: Box<dyn ImageWriter>,
    ) -> Result<Self> {
        let video_dir = root.join(Namespace::Video.dir_name());
        let image_dir = root.join(Namespace::Image.dir_name());
        for dir in [&video_dir, &image_dir] {
            fs::create_dir_all(dir).map_err(|e| AlbumError::write_failure(dir, e))?;
        }

        let catalog = Catalog::open(&root.join(CATALOG_FILE))?;
        catalog.initialize()?;

        let ids = IdAllocator::seeded(|kind| catalog.last_issued_id(kind))?;

        info!("Opened album at {:?}", root);
        Ok(Self {
            root: root.to_path_buf(),
            video_dir,
            image_dir,
            catalog,
            ids,
            decoder,
            writer,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn video_path(&self, video: &Video) -> PathBuf {
        self.video_dir.join(&video.name)
    }

    pub fn image_path(&self, image: &Image) -> PathBuf {
        self.image_dir.join(&image.name)
    }

    // ========================================================================
    // Videos
    // ========================================================================

    /// Copy (or move) `source` into the album and catalog it.
    pub fn add_video(&mut self, source: &Path, move_file: bool) -> Result<i64> {
        if !source.is_file() {
            return Err(AlbumError::FileNotFound(source.to_path_buf()));
        }
        let desired = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| AlbumError::FileNotFound(source.to_path_buf()))?;

        let tx = self.catalog.transaction()?;
        let video_dir = &self.video_dir;
        let name = resolve_unique_name(&desired, |candidate| {
            Ok::<_, rusqlite::Error>(
                tx.name_issued(Namespace::Video, candidate)? || video_dir.join(candidate).exists(),
            )
        })?;
        let dest = video_dir.join(&name);
        transfer(source, &dest, move_file)?;

        let snapshot = self.ids.snapshot();
        let video = Video {
            id: self.ids.next(EntityKind::Video),
            name,
            added_at: timestamp(),
        };
        if let Err(e) = tx.insert_video(&video).and_then(|()| tx.commit()) {
            self.ids.restore(snapshot);
            undo_transfer(source, &dest, move_file);
            return Err(e.into());
        }

        info!("Added video {} as {:?}", video.id, dest);
        Ok(video.id)
    }

    /// Remove a video, its crop definitions, their images, and the files.
    pub fn remove_video(&mut self, id: i64) -> Result<()> {
        let tx = self.catalog.transaction()?;
        let video = tx
            .video(id)?
            .ok_or_else(|| AlbumError::not_found(EntityKind::Video, id))?;

        let mut doomed = Vec::new();
        for definition in tx.crop_definitions_for_video(id)? {
            doomed.extend(delete_definition(&tx, &definition, &self.image_dir)?);
        }
        tx.delete_video(id)?;
        tx.commit()?;

        doomed.push(self.video_dir.join(&video.name));
        remove_files(&doomed);
        info!("Removed video {} ({} files)", id, doomed.len());
        Ok(())
    }

    pub fn video(&self, id: i64) -> Result<Option<Video>> {
        Ok(self.catalog.video(id)?)
    }

    pub fn videos(&self) -> Result<Vec<Video>> {
        Ok(self.catalog.videos()?)
    }

    /// Stream properties of a catalogued video, read through the decoder.
    pub fn video_info(&self, id: i64) -> Result<VideoInfo> {
        let video = self
            .catalog
            .video(id)?
            .ok_or_else(|| AlbumError::not_found(EntityKind::Video, id))?;
        let path = self.video_path(&video);
        let source = self
            .decoder
            .open(&path)
            .map_err(|source| AlbumError::VideoUnreadable { path, source })?;
        Ok(VideoInfo::from_source(source.as_ref()))
    }

    // ========================================================================
    // Crop definitions
    // ========================================================================

    pub fn add_crop_definition(
        &mut self,
        video_id: i64,
        range: FrameRange,
        rect: Option<CropRect>,
        description: &str,
    ) -> Result<i64> {
        range.validate()?;

        let tx = self.catalog.transaction()?;
        if !tx.video_exists(video_id)? {
            return Err(AlbumError::not_found(EntityKind::Video, video_id));
        }

        let snapshot = self.ids.snapshot();
        let definition = CropDefinition {
            id: self.ids.next(EntityKind::CropDefinition),
            video_id,
            description: description.to_string(),
            done: false,
            range,
            rect,
            added_at: timestamp(),
        };
        if let Err(e) = tx.insert_crop_definition(&definition).and_then(|()| tx.commit()) {
            self.ids.restore(snapshot);
            return Err(e.into());
        }

        debug!("Added crop definition {} for video {}", definition.id, video_id);
        Ok(definition.id)
    }

    /// Remove a crop definition together with its images and their files.
    pub fn remove_crop_definition(&mut self, id: i64) -> Result<()> {
        let tx = self.catalog.transaction()?;
        let definition = tx
            .crop_definition(id)?
            .ok_or_else(|| AlbumError::not_found(EntityKind::CropDefinition, id))?;

        let doomed = delete_definition(&tx, &definition, &self.image_dir)?;
        tx.commit()?;

        remove_files(&doomed);
        debug!("Removed crop definition {} ({} images)", id, doomed.len());
        Ok(())
    }

    pub fn crop_definition(&self, id: i64) -> Result<Option<CropDefinition>> {
        Ok(self.catalog.crop_definition(id)?)
    }

    pub fn crop_definitions(&self) -> Result<Vec<CropDefinition>> {
        Ok(self.catalog.crop_definitions()?)
    }

    pub fn crop_definitions_for_video(&self, video_id: i64) -> Result<Vec<CropDefinition>> {
        Ok(self.catalog.crop_definitions_for_video(video_id)?)
    }

    // ========================================================================
    // Extraction
    // ========================================================================

    /// Extract the images of one crop definition. A definition that is
    /// already done is left untouched.
    pub fn do_crop(&mut self, id: i64) -> Result<CropOutcome> {
        let engine = CropEngine {
            decoder: self.decoder.as_ref(),
            writer: self.writer.as_ref(),
            video_dir: &self.video_dir,
            image_dir: &self.image_dir,
        };
        engine.execute(&mut self.catalog, &mut self.ids, id)
    }

    /// Extract every definition that is not done yet. Failures are collected
    /// and do not stop the remaining definitions.
    pub fn do_crop_all(&mut self) -> Result<CropReport> {
        let pending = self.catalog.pending_crop_definition_ids()?;
        let mut report = CropReport::default();

        for id in pending {
            match self.do_crop(id) {
                Ok(outcome) => report.completed.push((id, outcome)),
                Err(e) => {
                    warn!("Crop definition {} failed: {}", id, e);
                    report.failed.push((id, e));
                }
            }
        }

        info!(
            "Cropped {} definitions, {} failed",
            report.completed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    // ========================================================================
    // Images
    // ========================================================================

    pub fn images(&self) -> Result<Vec<Image>> {
        Ok(self.catalog.images()?)
    }

    pub fn images_for_video(&self, video_id: i64) -> Result<Vec<Image>> {
        Ok(self.catalog.images_for_video(video_id)?)
    }

    pub fn images_for_definition(&self, definition_id: i64) -> Result<Vec<Image>> {
        Ok(self.catalog.images_for_definition(definition_id)?)
    }
}

/// Delete a definition's image rows and the definition row; returns the
/// image files to remove once the transaction commits.
fn delete_definition(
    tx: &CatalogTx<'_>,
    definition: &CropDefinition,
    image_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = tx
        .images_for_definition(definition.id)?
        .iter()
        .map(|image| image_dir.join(&image.name))
        .collect();
    tx.delete_images_for_definition(definition.id)?;
    tx.delete_crop_definition(definition.id)?;
    Ok(files)
}

fn transfer(source: &Path, dest: &Path, move_file: bool) -> Result<()> {
    let result = if move_file {
        // Rename within a filesystem, copy + delete across filesystems.
        fs::rename(source, dest).or_else(|_| {
            fs::copy(source, dest)?;
            fs::remove_file(source)
        })
    } else {
        fs::copy(source, dest).map(|_| ())
    };
    result.map_err(|e| AlbumError::write_failure(dest, e))
}

fn undo_transfer(source: &Path, dest: &Path, move_file: bool) {
    let result = if move_file {
        fs::rename(dest, source).or_else(|_| {
            fs::copy(dest, source)?;
            fs::remove_file(dest)
        })
    } else {
        fs::remove_file(dest)
    };
    if let Err(e) = result {
        warn!("Failed to undo import of {:?}: {}", dest, e);
    }
}

fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Already gone: {:?}", path);
            }
            Err(e) => warn!("Failed to remove {:?}: {}", path, e),
        }
    }
}
