//! Image conversion pipeline components.
//!
//! This module contains all the stages of a conversion:
//! - **discovery**: Find image files in directories
//! - **validate**: Pre-decode validation
//! - **decode**: Load images, dispatching raw and generic sources
//! - **raw**: Embedded preview extraction and sensor development
//! - **naming**: Collision-free output names
//! - **encode**: Color-mode normalization and writing
//! - **processor**: Orchestrates the full batch

pub mod decode;
pub mod discovery;
pub mod encode;
pub mod naming;
pub mod processor;
pub mod raw;
pub mod validate;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder, SourceKind};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use encode::{prepare_for_target, ImageEncoder};
pub use processor::{ConversionEvent, Converter, ProgressObserver};
pub use raw::{decode_raw, DngFile, RawSource, Thumbnail};
pub use validate::Validator;
