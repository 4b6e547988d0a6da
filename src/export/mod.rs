use anyhow::{bail, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::album::Album;
use crate::db::{CropDefinition, Image, Video};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => bail!("Unknown export format: {}", other),
        }
    }
}

/// Catalog view to export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTable {
    Videos,
    CropDefinitions,
    Images,
}

impl FromStr for ExportTable {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "videos" => Ok(ExportTable::Videos),
            "crops" | "definitions" => Ok(ExportTable::CropDefinitions),
            "images" => Ok(ExportTable::Images),
            other => bail!("Unknown table: {}", other),
        }
    }
}

impl ExportTable {
    pub fn name(&self) -> &'static str {
        match self {
            ExportTable::Videos => "videos",
            ExportTable::CropDefinitions => "crop_definitions",
            ExportTable::Images => "images",
        }
    }
}

/// File name used when no output path is given, e.g. `images.csv`.
pub fn default_file_name(table: ExportTable, format: ExportFormat) -> String {
    format!("{}.{}", table.name(), format.extension())
}

/// Write one catalog view to `output_path`; returns the number of rows.
pub fn export_table(
    album: &Album,
    table: ExportTable,
    format: ExportFormat,
    output_path: &Path,
) -> Result<usize> {
    match table {
        ExportTable::Videos => {
            let videos = album.videos()?;
            match format {
                ExportFormat::Json => export_json(&videos, output_path)?,
                ExportFormat::Csv => export_videos_csv(&videos, output_path)?,
            }
            Ok(videos.len())
        }
        ExportTable::CropDefinitions => {
            let definitions = album.crop_definitions()?;
            match format {
                ExportFormat::Json => export_json(&definitions, output_path)?,
                ExportFormat::Csv => export_definitions_csv(&definitions, output_path)?,
            }
            Ok(definitions.len())
        }
        ExportTable::Images => {
            let images = album.images()?;
            match format {
                ExportFormat::Json => export_json(&images, output_path)?,
                ExportFormat::Csv => export_images_csv(&images, output_path)?,
            }
            Ok(images.len())
        }
    }
}

fn export_json<T: Serialize>(rows: &[T], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(rows)?;
    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

fn export_videos_csv(videos: &[Video], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record(["id", "name", "added_at"])?;

    for video in videos {
        wtr.write_record([video.id.to_string(), video.name.clone(), video.added_at.clone()])?;
    }

    wtr.flush()?;
    Ok(())
}

fn export_definitions_csv(definitions: &[CropDefinition], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record([
        "id",
        "video_id",
        "description",
        "done",
        "index_start",
        "index_end",
        "index_step",
        "pixel_left",
        "pixel_top",
        "pixel_right",
        "pixel_bottom",
        "added_at",
    ])?;

    // Full-frame definitions leave the rectangle columns empty
    let opt = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_default();

    for d in definitions {
        wtr.write_record([
            d.id.to_string(),
            d.video_id.to_string(),
            d.description.clone(),
            d.done.to_string(),
            d.range.start.to_string(),
            d.range.end.to_string(),
            d.range.step.to_string(),
            opt(d.rect.map(|r| r.left)),
            opt(d.rect.map(|r| r.top)),
            opt(d.rect.map(|r| r.right)),
            opt(d.rect.map(|r| r.bottom)),
            d.added_at.clone(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn export_images_csv(images: &[Image], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record(["id", "definition_id", "name", "index_in_definition", "added_at"])?;

    for image in images {
        wtr.write_record([
            image.id.to_string(),
            image.definition_id.to_string(),
            image.name.clone(),
            image.index_in_definition.to_string(),
            image.added_at.clone(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
