//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Output encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,

    /// Conversion report format ("json" or "jsonl")
    pub report_format: String,

    /// Pretty-print JSON reports
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            report_format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            // Medium format raw files routinely exceed 100MB.
            max_file_size_mb: 512,
            max_image_dimension: 30000,
        }
    }
}

/// Camera raw handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Use the embedded preview when one is readable.
    /// When false, every raw file goes through the full demosaic.
    pub prefer_embedded_preview: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            prefer_embedded_preview: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
