use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Album opened when no `--album` is given.
    #[serde(default = "default_album_dir")]
    pub album_dir: PathBuf,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StillFormat {
    #[default]
    Jpg,
    Png,
}

impl StillFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            StillFormat::Jpg => "jpg",
            StillFormat::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub image_format: StillFormat,

    /// JPEG quality, 1-100. Ignored for PNG.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    95
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            image_format: StillFormat::default(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Program used to decode frames; a bare name is looked up on PATH.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Extensions picked up when importing a whole directory.
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Move instead of copy when importing.
    #[serde(default)]
    pub move_files: bool,
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "m4v", "mov", "mkv", "avi", "webm", "wmv", "mpg", "mpeg", "flv"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            video_extensions: default_video_extensions(),
            move_files: false,
        }
    }
}

fn default_album_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("videoknife")
        .join("album")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            album_dir: default_album_dir(),
            extraction: ExtractionConfig::default(),
            decoder: DecoderConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl Config {
    /// Load from `VIDEOKNIFE_CONFIG` or the default location, writing a
    /// default config file on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("videoknife")
    }

    fn config_path() -> PathBuf {
        match std::env::var_os("VIDEOKNIFE_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => Self::config_dir().join("config.toml"),
        }
    }
}
