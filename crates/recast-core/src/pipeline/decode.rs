//! Decoding of source files into rasters, dispatched on source kind.

use image::{DynamicImage, GenericImageView};
use std::path::Path;

use crate::codecs;
use crate::config::{LimitsConfig, RawConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{DecodePath, RAW_EXTENSIONS};

use super::raw::{decode_raw, DngFile};
use super::validate::Validator;

/// Which decoder family handles a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Camera raw container (DNG)
    RawCamera,
    /// Anything the generic decoders open, HEIC included
    Generic,
}

impl SourceKind {
    /// Classify by extension, ignoring case.
    pub fn from_path(path: &Path) -> Self {
        let is_raw = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| RAW_EXTENSIONS.iter().any(|raw| raw.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if is_raw {
            SourceKind::RawCamera
        } else {
            SourceKind::Generic
        }
    }
}

/// Image decoder with configurable limits.
pub struct ImageDecoder {
    validator: Validator,
    prefer_preview: bool,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Which decoder produced the raster
    pub decode_path: DecodePath,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig, raw: &RawConfig) -> Self {
        Self {
            validator: Validator::new(limits),
            prefer_preview: raw.prefer_embedded_preview,
        }
    }

    /// Decode `path` and check the result against the dimension limit.
    ///
    /// Blocking; callers on an async runtime should move this off the
    /// executor.
    pub fn decode(&self, path: &Path) -> PipelineResult<DecodedImage> {
        let (image, decode_path) = match SourceKind::from_path(path) {
            SourceKind::RawCamera => {
                let source = DngFile::open(path)?;
                decode_raw(&source, self.prefer_preview)?
            }
            SourceKind::Generic => (Self::decode_generic(path)?, DecodePath::Generic),
        };

        let (width, height) = image.dimensions();
        self.validator.check_dimensions(path, width, height)?;

        Ok(DecodedImage {
            image,
            width,
            height,
            decode_path,
        })
    }

    fn decode_generic(path: &Path) -> PipelineResult<DynamicImage> {
        if is_heif(path) {
            return codecs::decode_heif(path);
        }

        let decode_err = |message: String| PipelineError::Decode {
            path: path.to_path_buf(),
            message,
        };

        image::ImageReader::open(path)
            .map_err(|e| decode_err(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| decode_err(format!("Cannot detect image format: {}", e)))?
            .decode()
            .map_err(|e| decode_err(e.to_string()))
    }
}

fn is_heif(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("heic") || ext.eq_ignore_ascii_case("heif"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn decoder() -> ImageDecoder {
        ImageDecoder::new(LimitsConfig::default(), &RawConfig::default())
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::from_path(Path::new("a.dng")), SourceKind::RawCamera);
        assert_eq!(SourceKind::from_path(Path::new("A.DNG")), SourceKind::RawCamera);
        assert_eq!(SourceKind::from_path(Path::new("a.heic")), SourceKind::Generic);
        assert_eq!(SourceKind::from_path(Path::new("a.jpg")), SourceKind::Generic);
        assert_eq!(SourceKind::from_path(Path::new("dng")), SourceKind::Generic);
    }

    #[test]
    fn test_decode_generic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        write_png(&path, 5, 3);

        let decoded = decoder().decode(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (5, 3));
        assert_eq!(decoded.decode_path, DecodePath::Generic);
    }

    #[test]
    fn test_format_detected_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misnamed.jpg");
        write_png(&path, 4, 4);

        let decoded = decoder().decode(&path).unwrap();
        assert_eq!(decoded.width, 4);
    }

    #[test]
    fn test_dimension_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        write_png(&path, 64, 2);

        let limits = LimitsConfig {
            max_image_dimension: 32,
            ..Default::default()
        };
        let err = ImageDecoder::new(limits, &RawConfig::default())
            .decode(&path)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 64, .. }));
    }

    #[test]
    fn test_corrupt_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nthen nothing useful").unwrap();

        let err = decoder().decode(&path).err().unwrap();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_corrupt_raw_is_raw_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.DNG");
        std::fs::write(&path, b"II*\0garbage").unwrap();

        let err = decoder().decode(&path).err().unwrap();
        assert!(matches!(err, PipelineError::Raw { .. }));
    }

    #[cfg(not(feature = "heic"))]
    #[test]
    fn test_heic_without_codec() {
        codecs::register();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IMG_0001.HEIC");
        std::fs::write(&path, b"\0\0\0\x18ftypheic").unwrap();

        let err = decoder().decode(&path).err().unwrap();
        assert!(matches!(err, PipelineError::CodecUnavailable { .. }));
    }
}
