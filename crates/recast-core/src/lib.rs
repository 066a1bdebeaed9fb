//! Recast Core - batch image format conversion.
//!
//! Recast walks a directory tree, decodes every supported image (camera raw
//! DNG, HEIC, JPEG, PNG, BMP, TIFF, WebP) and writes it to a destination
//! directory in one target format, never overwriting existing files.
//!
//! # Architecture
//!
//! ```text
//! Discover → Validate → Name → Decode (raw preview | demosaic | generic) → Encode
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use recast_core::{Config, ConversionEvent, Converter, TargetFormat};
//! use std::path::Path;
//!
//! fn main() -> recast_core::Result<()> {
//!     let config = Config::load()?;
//!     let converter = Converter::new(&config);
//!     let target = TargetFormat::parse("jpg")?;
//!
//!     let summary = converter.run(
//!         Path::new("./photos"),
//!         Path::new("./converted"),
//!         &target,
//!         &mut |event: ConversionEvent<'_>| println!("{event:?}"),
//!     )?;
//!     println!("Converted {} files", summary.converted);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod codecs;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    ConfigError, PipelineError, PipelineResult, RecastError, Result, SetupError, ThumbnailError,
};
pub use output::{OutputWriter, ReportFormat};
pub use pipeline::{ConversionEvent, Converter, DiscoveredFile, ProgressObserver};
pub use types::{BatchSummary, ConversionRecord, ConversionStatus, DecodePath, TargetFormat};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
