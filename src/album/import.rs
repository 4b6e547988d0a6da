use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::Album;
use crate::error::{AlbumError, Result};

/// Outcome of importing a directory of videos.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub added: Vec<(PathBuf, i64)>,
    pub failed: Vec<(PathBuf, AlbumError)>,
}

/// Video files directly inside `directory`, sorted by path.
pub fn discover_videos(directory: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut videos: Vec<PathBuf> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| extensions.iter().any(|e| e.to_lowercase() == ext))
        })
        .collect();

    videos.sort();
    videos
}

impl Album {
    /// Add every video file found directly inside `directory`. Files that
    /// fail to import are reported and do not stop the others.
    pub fn add_videos_from_dir(
        &mut self,
        directory: &Path,
        extensions: &[String],
        move_files: bool,
    ) -> Result<ImportReport> {
        if !directory.is_dir() {
            return Err(AlbumError::FileNotFound(directory.to_path_buf()));
        }

        let mut report = ImportReport::default();
        for path in discover_videos(directory, extensions) {
            match self.add_video(&path, move_files) {
                Ok(id) => report.added.push((path, id)),
                Err(e) => {
                    warn!("Failed to import {:?}: {}", path, e);
                    report.failed.push((path, e));
                }
            }
        }

        info!(
            "Imported {} videos from {:?}, {} failed",
            report.added.len(),
            directory,
            report.failed.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_video, ScriptedWriter, SyntheticDecoder};
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn extensions() -> Vec<String> {
        vec!["mp4".to_string(), "mov".to_string()]
    }

    #[test]
    fn test_discover_videos() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("b.mp4")).unwrap();
        File::create(dir.path().join("a.MOV")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        File::create(dir.path().join("noext")).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        File::create(dir.path().join("nested/c.mp4")).unwrap();

        let found = discover_videos(dir.path(), &extensions());
        assert_eq!(found, vec![dir.path().join("a.MOV"), dir.path().join("b.mp4")]);
    }

    #[test]
    fn test_add_videos_from_dir() {
        let dir = tempdir().unwrap();
        let sources = dir.path().join("incoming");
        fs::create_dir(&sources).unwrap();
        write_video(&sources, "one.mp4");
        write_video(&sources, "two.mov");
        File::create(sources.join("readme.txt")).unwrap();

        let mut album = Album::with_backends(
            &dir.path().join("album"),
            Box::new(SyntheticDecoder::new(8, 8, 1)),
            Box::new(ScriptedWriter::default()),
        )
        .unwrap();

        let report = album.add_videos_from_dir(&sources, &extensions(), true).unwrap();
        assert_eq!(report.added.len(), 2);
        assert!(report.failed.is_empty());
        assert!(!sources.join("one.mp4").exists());

        let names: Vec<String> = album.videos().unwrap().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["one.mp4", "two.mov"]);

        assert!(matches!(
            album.add_videos_from_dir(&dir.path().join("missing"), &extensions(), false),
            Err(AlbumError::FileNotFound(_))
        ));
    }
}
