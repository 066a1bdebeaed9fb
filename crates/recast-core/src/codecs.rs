//! One-time registration of container codecs that live outside the `image` crate.
//!
//! HEIC decoding goes through libheif when the `heic` feature is enabled.
//! [`register`] must run before the first HEIC decode; calling it again is a no-op.

use image::DynamicImage;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{PipelineError, PipelineResult};

static REGISTRY: OnceLock<Capabilities> = OnceLock::new();

/// Container codecs available to the generic decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// HEIC/HEIF containers can be opened
    pub heif: bool,
}

/// Register the optional codecs. Idempotent.
pub fn register() -> &'static Capabilities {
    REGISTRY.get_or_init(|| {
        let capabilities = Capabilities {
            heif: cfg!(feature = "heic"),
        };
        tracing::debug!("Registered container codecs: {:?}", capabilities);
        capabilities
    })
}

/// Capabilities, if [`register`] has run.
pub fn registered() -> Option<&'static Capabilities> {
    REGISTRY.get()
}

/// Decode a HEIC/HEIF file into an 8-bit RGB(A) raster.
pub fn decode_heif(path: &Path) -> PipelineResult<DynamicImage> {
    let unavailable = |message: &str| PipelineError::CodecUnavailable {
        path: path.to_path_buf(),
        codec: "HEIF",
        message: message.to_string(),
    };

    match registered() {
        None => Err(unavailable("codecs were not registered")),
        Some(caps) if !caps.heif => Err(unavailable("built without the `heic` feature")),
        Some(_) => heif::decode(path),
    }
}

#[cfg(feature = "heic")]
mod heif {
    use image::{DynamicImage, RgbImage, RgbaImage};
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
    use std::path::Path;

    use crate::error::{PipelineError, PipelineResult};

    pub fn decode(path: &Path) -> PipelineResult<DynamicImage> {
        let fail = |message: String| PipelineError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let path_str = path
            .to_str()
            .ok_or_else(|| fail("path is not valid UTF-8".to_string()))?;
        let lib = LibHeif::new();
        let ctx = HeifContext::read_from_file(path_str).map_err(|e| fail(e.to_string()))?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| fail(e.to_string()))?;

        let has_alpha = handle.has_alpha_channel();
        let chroma = if has_alpha {
            RgbChroma::Rgba
        } else {
            RgbChroma::Rgb
        };
        let decoded = lib
            .decode(&handle, ColorSpace::Rgb(chroma), None)
            .map_err(|e| fail(e.to_string()))?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| fail("decoder returned no interleaved plane".to_string()))?;

        let channels = if has_alpha { 4 } else { 3 };
        let row_len = plane.width as usize * channels;
        let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
        for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
            pixels.extend_from_slice(&row[..row_len]);
        }

        let image = if has_alpha {
            RgbaImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgb8)
        };
        image.ok_or_else(|| fail("pixel buffer does not match dimensions".to_string()))
    }
}

#[cfg(not(feature = "heic"))]
mod heif {
    use image::DynamicImage;
    use std::path::Path;

    use crate::error::{PipelineError, PipelineResult};

    pub fn decode(path: &Path) -> PipelineResult<DynamicImage> {
        Err(PipelineError::CodecUnavailable {
            path: path.to_path_buf(),
            codec: "HEIF",
            message: "built without the `heic` feature".to_string(),
        })
    }
}
