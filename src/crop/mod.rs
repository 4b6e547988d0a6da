//! Crop execution: turn a crop definition into image files and rows.
//!
//! A run either commits every image row together with the definition's
//! `done` flag, or leaves no trace: the transaction is rolled back, the image
//! id counter is restored and the files written so far are deleted. Frames
//! that fail to decode or encode are skipped and do not abort the run.

mod geometry;

pub use geometry::{effective_rect, image_file_name, CropRect, FrameRange};

use image::imageops;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::db::{timestamp, Catalog, CatalogRead, CatalogTx, CropDefinition, Image};
use crate::error::{AlbumError, Result};
use crate::frames::{FrameSource, ImageWriter, VideoDecoder};
use crate::ids::{EntityKind, IdAllocator};
use crate::naming::{resolve_unique_name, Namespace};

/// Result of executing one crop definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropOutcome {
    /// The definition had already been extracted; nothing changed.
    AlreadyDone,
    /// `images` files were written and `skipped` sampled frames produced none.
    Extracted { images: usize, skipped: usize },
}

pub struct CropEngine<'a> {
    pub decoder: &'a dyn VideoDecoder,
    pub writer: &'a dyn ImageWriter,
    pub video_dir: &'a Path,
    pub image_dir: &'a Path,
}

impl CropEngine<'_> {
    pub fn execute(
        &self,
        catalog: &mut Catalog,
        ids: &mut IdAllocator,
        definition_id: i64,
    ) -> Result<CropOutcome> {
        let definition = catalog
            .crop_definition(definition_id)?
            .ok_or_else(|| AlbumError::not_found(EntityKind::CropDefinition, definition_id))?;
        if definition.done {
            debug!("Crop definition {} already done", definition_id);
            return Ok(CropOutcome::AlreadyDone);
        }

        let video = catalog
            .video(definition.video_id)?
            .ok_or_else(|| AlbumError::not_found(EntityKind::Video, definition.video_id))?;
        let video_path = self.video_dir.join(&video.name);

        let mut source = self
            .decoder
            .open(&video_path)
            .map_err(|source| AlbumError::VideoUnreadable {
                path: video_path.clone(),
                source,
            })?;

        let (width, height) = source.dimensions();
        let rect = effective_rect(definition.rect, width, height)?;
        definition.range.validate()?;
        let range = definition.range.clamped(source.frame_count());

        let snapshot = ids.snapshot();
        let mut written = Vec::new();
        let result = self.extract(
            catalog,
            ids,
            &definition,
            rect,
            range,
            source.as_mut(),
            &mut written,
        );

        match result {
            Ok(outcome) => {
                if let CropOutcome::Extracted { images, skipped } = outcome {
                    info!(
                        "Crop definition {} done: {} images, {} frames skipped",
                        definition_id, images, skipped
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                ids.restore(snapshot);
                remove_written(&written);
                warn!(
                    "Crop definition {} rolled back after {} images: {}",
                    definition_id,
                    written.len(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Runs inside one transaction; an early return drops it uncommitted.
    #[allow(clippy::too_many_arguments)]
    fn extract(
        &self,
        catalog: &mut Catalog,
        ids: &mut IdAllocator,
        definition: &CropDefinition,
        rect: CropRect,
        range: FrameRange,
        source: &mut dyn FrameSource,
        written: &mut Vec<PathBuf>,
    ) -> Result<CropOutcome> {
        let tx = catalog.transaction()?;
        let mut images = 0;
        let mut skipped = 0;

        for (it, index) in range.indices().enumerate() {
            let Some(frame) = source.read_frame_at(index as u64) else {
                warn!("Skipping unreadable frame {} of video {}", index, definition.video_id);
                skipped += 1;
                continue;
            };

            let cropped = imageops::crop_imm(
                &frame,
                rect.left as u32,
                rect.top as u32,
                rect.width() as u32,
                rect.height() as u32,
            )
            .to_image();

            let desired = image_file_name(definition.video_id, index, &rect, self.writer.extension());
            let name = self.resolve_image_name(&tx, &desired)?;
            let path = self.image_dir.join(&name);

            if let Err(e) = self.writer.write(&cropped, &path) {
                warn!("Skipping frame {}: failed to write {:?}: {}", index, path, e);
                remove_partial(&path);
                skipped += 1;
                continue;
            }
            written.push(path);

            let image = Image {
                id: ids.next(EntityKind::Image),
                definition_id: definition.id,
                name,
                index_in_definition: it as i64,
                added_at: timestamp(),
            };
            tx.insert_image(&image)?;
            images += 1;
        }

        tx.mark_done(definition.id)?;
        tx.commit()?;

        Ok(CropOutcome::Extracted { images, skipped })
    }

    fn resolve_image_name(&self, tx: &CatalogTx<'_>, desired: &str) -> Result<String> {
        let name = resolve_unique_name(desired, |candidate| {
            Ok::<_, rusqlite::Error>(
                tx.name_issued(Namespace::Image, candidate)?
                    || self.image_dir.join(candidate).exists(),
            )
        })?;
        Ok(name)
    }
}

/// Drop whatever a failed write left behind.
fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial file {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial file {:?}: {}", path, e),
    }
}

fn remove_written(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove {:?} during rollback: {}", path, e);
        }
    }
}
