//! Core data types shared by the pipeline stages and the CLI.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SetupError;

/// Source extensions picked up by discovery, matched case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "heic", "dng", "jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp",
];

/// Extensions decoded through the camera raw path.
pub const RAW_EXTENSIONS: &[&str] = &["dng"];

/// The format every discovered file is converted to.
///
/// Keeps the extension as the user spelled it (`.jpeg` stays `.jpeg`),
/// lowercased and with a leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFormat {
    extension: String,
    format: ImageFormat,
}

impl TargetFormat {
    /// Parse a target extension such as `jpg`, `.PNG` or `.webp`.
    pub fn parse(raw: &str) -> Result<Self, SetupError> {
        let trimmed = raw.trim();
        let bare = trimmed.trim_start_matches('.').to_lowercase();
        if bare.is_empty() {
            return Err(SetupError::UnsupportedTarget(raw.to_string()));
        }
        let format = ImageFormat::from_extension(&bare)
            .filter(|f| f.writing_enabled())
            .ok_or_else(|| SetupError::UnsupportedTarget(format!(".{bare}")))?;
        Ok(Self {
            extension: format!(".{bare}"),
            format,
        })
    }

    /// Extension including the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Encoder used for this target.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Lossy photographic formats that cannot carry alpha or a palette.
    pub fn is_opaque(&self) -> bool {
        matches!(self.format, ImageFormat::Jpeg)
    }

    /// Formats whose encoders only accept 8-bit samples.
    pub fn requires_8bit(&self) -> bool {
        matches!(
            self.format,
            ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::WebP
                | ImageFormat::Gif
                | ImageFormat::Ico
                | ImageFormat::Qoi
        )
    }
}

impl FromStr for TargetFormat {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.extension)
    }
}

/// How a raster was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePath {
    /// Generic image decoder
    Generic,
    /// JPEG preview embedded in a raw file
    EmbeddedJpeg,
    /// Uncompressed bitmap preview embedded in a raw file
    EmbeddedBitmap,
    /// Full demosaic of the raw sensor data
    Demosaic,
}

/// Outcome of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Converted,
    Failed,
}

/// Report entry for a single source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Source file path
    pub source: PathBuf,

    /// Written file (or the name chosen before a failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,

    pub status: ConversionStatus,

    /// Error message for failed files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Decoded width in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Decoded height in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_path: Option<DecodePath>,

    /// Source file size in bytes
    pub bytes_read: u64,
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Destination directory
    pub destination: PathBuf,
    /// Files found by discovery
    pub discovered: usize,
    /// Files written
    pub converted: usize,
    /// Files that failed at any stage
    pub failed: usize,
    /// Total size of the discovered sources
    pub bytes_read: u64,
    /// Wall time of the per-file loop
    pub elapsed: Duration,
    /// One record per discovered file, in processing order
    pub records: Vec<ConversionRecord>,
}

impl BatchSummary {
    /// Files converted per second.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.converted as f64 / secs
        } else {
            0.0
        }
    }
}
