//! Raw camera decoding.
//!
//! A raw file is first asked for its embedded preview. Any failure there
//! (no preview, unreadable preview, unsupported compression) falls back to
//! developing the sensor data.

pub mod develop;
pub mod preview;

#[cfg(test)]
pub(crate) mod fixtures;

pub use develop::{CfaPattern, SensorFrame, SensorLayout};
pub use preview::{extract_preview, Thumbnail};

use image::DynamicImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult, ThumbnailError};
use crate::types::DecodePath;

/// Something that can hand out a raw file's preview or develop its sensor data.
pub trait RawSource {
    /// Path used in error messages.
    fn path(&self) -> &Path;

    /// The embedded preview, if there is a usable one.
    fn preview(&self) -> Result<Thumbnail, ThumbnailError>;

    /// Full development of the sensor data.
    fn develop(&self) -> PipelineResult<DynamicImage>;
}

/// A DNG file held in memory.
pub struct DngFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl DngFile {
    /// Read a DNG from disk.
    pub fn open(path: &Path) -> PipelineResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::FileNotFound(path.to_path_buf())
            } else {
                PipelineError::Raw {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;
        Ok(Self::from_bytes(path, bytes))
    }

    /// Wrap DNG bytes already in memory. `path` only labels errors.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }
}

impl RawSource for DngFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn preview(&self) -> Result<Thumbnail, ThumbnailError> {
        extract_preview(&self.bytes)
    }

    fn develop(&self) -> PipelineResult<DynamicImage> {
        let raw_err = |message: String| PipelineError::Raw {
            path: self.path.clone(),
            message,
        };

        let raw = rawloader::decode(&mut Cursor::new(self.bytes.as_slice()))
            .map_err(|e| raw_err(e.to_string()))?;
        tracing::debug!(
            "Developing {} {} sensor data ({}x{}, cfa {})",
            raw.clean_make,
            raw.clean_model,
            raw.width,
            raw.height,
            raw.cfa.name
        );

        SensorFrame::from_rawloader(raw)
            .and_then(|frame| frame.develop())
            .map_err(|e| raw_err(e.to_string()))
    }
}

/// Decode a raw file, preferring its embedded preview.
///
/// Every preview failure is logged and routed to full development.
pub fn decode_raw<S: RawSource + ?Sized>(
    source: &S,
    prefer_preview: bool,
) -> PipelineResult<(DynamicImage, DecodePath)> {
    if prefer_preview {
        match source.preview().and_then(Thumbnail::into_image) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => tracing::debug!(
                "Preview unusable for {:?}, developing sensor data: {e}",
                source.path()
            ),
        }
    }

    source
        .develop()
        .map(|image| (image, DecodePath::Demosaic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::cell::Cell;

    struct FakeRaw {
        preview: fn() -> Result<Thumbnail, ThumbnailError>,
        developed: Cell<bool>,
    }

    impl FakeRaw {
        fn new(preview: fn() -> Result<Thumbnail, ThumbnailError>) -> Self {
            Self {
                preview,
                developed: Cell::new(false),
            }
        }
    }

    impl RawSource for FakeRaw {
        fn path(&self) -> &Path {
            Path::new("fake.dng")
        }

        fn preview(&self) -> Result<Thumbnail, ThumbnailError> {
            (self.preview)()
        }

        fn develop(&self) -> PipelineResult<DynamicImage> {
            self.developed.set(true);
            Ok(DynamicImage::new_rgb8(6, 4))
        }
    }

    fn bitmap() -> Result<Thumbnail, ThumbnailError> {
        Ok(Thumbnail::Bitmap(RgbImage::new(3, 2)))
    }

    #[test]
    fn test_preview_is_preferred() {
        let source = FakeRaw::new(bitmap);
        let (image, path) = decode_raw(&source, true).unwrap();
        assert_eq!(path, DecodePath::EmbeddedBitmap);
        assert_eq!(image.width(), 3);
        assert!(!source.developed.get());
    }

    #[test]
    fn test_every_preview_failure_falls_back() {
        let failures: [fn() -> Result<Thumbnail, ThumbnailError>; 4] = [
            || Err(ThumbnailError::Missing),
            || Err(ThumbnailError::Unsupported("compression scheme 34892".into())),
            || Err(ThumbnailError::Corrupt("truncated".into())),
            || Ok(Thumbnail::Jpeg(vec![0xFF, 0xD8])),
        ];

        for preview in failures {
            let source = FakeRaw::new(preview);
            let (image, path) = decode_raw(&source, true).unwrap();
            assert_eq!(path, DecodePath::Demosaic);
            assert_eq!(image.width(), 6);
            assert!(source.developed.get());
        }
    }

    #[test]
    fn test_preview_can_be_skipped() {
        let source = FakeRaw::new(bitmap);
        let (_, path) = decode_raw(&source, false).unwrap();
        assert_eq!(path, DecodePath::Demosaic);
    }

    #[test]
    fn test_dng_without_preview_is_developed() {
        let source = DngFile::from_bytes("sensor.dng", fixtures::synthetic_dng(16, 12, false));
        assert!(source.preview().is_err());

        let (image, path) = decode_raw(&source, true).unwrap();
        assert_eq!(path, DecodePath::Demosaic);
        assert_eq!((image.width(), image.height()), (16, 12));
        assert!(image.to_rgb8().pixels().any(|p| p.0 != [0, 0, 0]));
    }

    #[test]
    fn test_dng_with_broken_jpeg_preview_is_developed() {
        let source = DngFile::from_bytes("sensor.dng", fixtures::synthetic_dng(16, 12, true));
        assert!(matches!(source.preview(), Ok(Thumbnail::Jpeg(_))));

        let (image, path) = decode_raw(&source, true).unwrap();
        assert_eq!(path, DecodePath::Demosaic);
        assert_eq!((image.width(), image.height()), (16, 12));
    }

    #[test]
    fn test_dng_sensor_frame_keeps_levels_and_pattern() {
        let bytes = fixtures::synthetic_dng(16, 12, false);
        let raw = rawloader::decode(&mut Cursor::new(bytes.as_slice())).unwrap();
        let frame = SensorFrame::from_rawloader(raw).unwrap();

        assert_eq!((frame.width, frame.height), (16, 12));
        assert_eq!(frame.layout, SensorLayout::Bayer(CfaPattern::Rggb));
        assert_eq!(frame.white, [4095.0; 3]);
        assert_eq!(frame.samples[0], fixtures::sensor_sample(0, 0));
        assert_eq!(frame.samples[16 + 3], fixtures::sensor_sample(3, 1));
    }

    #[test]
    fn test_garbage_dng_fails_both_paths() {
        let source = DngFile::from_bytes("broken.dng", b"not a raw file at all".to_vec());
        let err = decode_raw(&source, true).unwrap_err();
        assert!(matches!(err, PipelineError::Raw { .. }));
        assert!(err.to_string().contains("broken.dng"));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DngFile::open(&dir.path().join("gone.dng"))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }
}
