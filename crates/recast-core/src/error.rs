//! Error types for the Recast conversion pipeline.
//!
//! Errors are split by how far they reach: setup errors abort the run before
//! any file is touched, pipeline errors are scoped to a single file and are
//! recovered by the batch driver.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Recast operations.
#[derive(Error, Debug)]
pub enum RecastError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors that prevent a batch from starting
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Fatal errors raised before the per-file loop starts.
#[derive(Error, Debug)]
pub enum SetupError {
    /// Source directory does not exist
    #[error("Directory not found: {0}")]
    NotFound(PathBuf),

    /// Source path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Target extension has no encoder
    #[error("Unsupported target extension: {0}")]
    UnsupportedTarget(String),

    /// Destination directory could not be created
    #[error("Cannot create destination directory {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-file pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Raw sensor decoding or demosaicing failed
    #[error("Raw decode failed for {path}: {message}")]
    Raw { path: PathBuf, message: String },

    /// No decoder is available for the container
    #[error("No {codec} decoder available for {path}: {message}")]
    CodecUnavailable {
        path: PathBuf,
        codec: &'static str,
        message: String,
    },

    /// Output name could not be resolved
    #[error("Cannot resolve output name in {dir}: {source}")]
    Naming {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding or writing the output failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Reasons an embedded raw preview could not be used.
///
/// Every variant sends the raw decoder down the full demosaic path.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    /// The container holds no reduced-resolution image
    #[error("no embedded preview")]
    Missing,

    /// The preview uses a compression or layout we do not read
    #[error("unsupported preview format: {0}")]
    Unsupported(String),

    /// The container or preview data is malformed
    #[error("corrupt preview: {0}")]
    Corrupt(String),
}

/// Failures while turning raw sensor data into a raster.
#[derive(Error, Debug)]
pub enum DevelopError {
    /// The color filter array is not a 2x2 Bayer pattern (e.g. X-Trans)
    #[error("unsupported color filter array: {0}")]
    UnsupportedCfa(String),

    /// Neither one (CFA) nor three (linear RGB) samples per pixel
    #[error("unsupported samples per pixel: {0}")]
    UnsupportedSamples(usize),

    /// The crop leaves no pixels
    #[error("empty frame after crop ({width}x{height})")]
    EmptyFrame { width: usize, height: usize },

    /// Sample buffer length does not match the frame geometry
    #[error("sample buffer holds {actual} values, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// The demosaic routine rejected the frame
    #[error("demosaic failed: {0}")]
    Demosaic(String),
}

/// Convenience type alias for Recast results.
pub type Result<T> = std::result::Result<T, RecastError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_messages_name_the_path() {
        let err = SetupError::NotFound(PathBuf::from("/no/such/dir"));
        assert_eq!(err.to_string(), "Directory not found: /no/such/dir");

        let err = SetupError::NotADirectory(PathBuf::from("/etc/hosts"));
        assert_eq!(err.to_string(), "Not a directory: /etc/hosts");
    }

    #[test]
    fn test_setup_error_is_transparent_at_top_level() {
        let err: RecastError = SetupError::UnsupportedTarget(".xyz".into()).into();
        assert_eq!(err.to_string(), "Unsupported target extension: .xyz");
    }

    #[test]
    fn test_top_level_errors_are_fatal_only() {
        // Per-file errors never reach the top level; they end up in the summary.
        let errors: [RecastError; 2] = [
            ConfigError::ValidationError("jpeg_quality must be 1-100".into()).into(),
            SetupError::NotFound(PathBuf::from("/in")).into(),
        ];
        for err in errors {
            match err {
                RecastError::Config(e) => assert!(e.to_string().contains("jpeg_quality")),
                RecastError::Setup(e) => assert!(matches!(e, SetupError::NotFound(_))),
            }
        }
    }
}
