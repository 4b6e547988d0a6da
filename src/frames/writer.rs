use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::ImageWriter;
use crate::config::{ExtractionConfig, StillFormat};

/// Encodes frames with the `image` crate.
pub struct CodecWriter {
    format: StillFormat,
    jpeg_quality: u8,
}

impl CodecWriter {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            format: config.image_format,
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
        }
    }
}

impl ImageWriter for CodecWriter {
    fn extension(&self) -> &str {
        self.format.extension()
    }

    fn write(&self, image: &RgbImage, path: &Path) -> image::ImageResult<()> {
        match self.format {
            StillFormat::Jpg => {
                let file = File::create(path)?;
                let mut out = BufWriter::new(file);
                JpegEncoder::new_with_quality(&mut out, self.jpeg_quality).encode_image(image)?;
                out.flush()?;
                Ok(())
            }
            StillFormat::Png => image.save_with_format(path, ImageFormat::Png),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::tempdir;

    fn frame() -> RgbImage {
        RgbImage::from_fn(32, 16, |x, y| Rgb([x as u8 * 8, y as u8 * 16, 128]))
    }

    #[test]
    fn test_writes_jpeg() {
        let dir = tempdir().unwrap();
        let writer = CodecWriter::new(&ExtractionConfig::default());
        assert_eq!(writer.extension(), "jpg");

        let path = dir.path().join("frame.jpg");
        writer.write(&frame(), &path).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn test_writes_png_losslessly() {
        let dir = tempdir().unwrap();
        let writer = CodecWriter::new(&ExtractionConfig {
            image_format: StillFormat::Png,
            ..ExtractionConfig::default()
        });
        assert_eq!(writer.extension(), "png");

        let path = dir.path().join("frame.png");
        writer.write(&frame(), &path).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8(), frame());
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let writer = CodecWriter::new(&ExtractionConfig::default());
        assert!(writer.write(&frame(), &dir.path().join("nope/frame.jpg")).is_err());
    }
}
