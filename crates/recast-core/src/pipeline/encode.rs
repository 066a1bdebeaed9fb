//! Color-mode normalization and writing of converted images.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageError, ImageFormat};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::OutputConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::TargetFormat;

/// Writes rasters in the target format.
pub struct ImageEncoder {
    jpeg_quality: u8,
}

impl ImageEncoder {
    /// Create an encoder with the given output settings.
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Normalize `image` for `target` and write it to `output`.
    ///
    /// Missing parent directories are created. The output is opened with
    /// create-new semantics, so an existing file is never replaced. A file
    /// left half-written by a failed encode is removed.
    pub fn encode(
        &self,
        image: DynamicImage,
        target: &TargetFormat,
        output: &Path,
    ) -> PipelineResult<()> {
        let encode_err = |message: String| PipelineError::Encode {
            path: output.to_path_buf(),
            message,
        };

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| encode_err(e.to_string()))?;
        }

        let image = prepare_for_target(image, target);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(output)
            .map_err(|e| encode_err(e.to_string()))?;
        let mut writer = BufWriter::new(file);

        let result = match target.format() {
            ImageFormat::Jpeg => image.write_with_encoder(JpegEncoder::new_with_quality(
                &mut writer,
                self.jpeg_quality,
            )),
            format => image.write_to(&mut writer, format),
        }
        .and_then(|()| writer.flush().map_err(ImageError::IoError));

        if let Err(e) = result {
            drop(writer);
            if let Err(cleanup) = fs::remove_file(output) {
                tracing::warn!("Could not remove partial output {:?}: {cleanup}", output);
            }
            return Err(encode_err(e.to_string()));
        }

        Ok(())
    }
}

/// Convert `image` into a color mode the target encoder accepts.
///
/// Opaque targets (JPEG) get alpha and palette images flattened to 8-bit
/// RGB. Targets with 8-bit-only encoders get their bit depth reduced, keeping
/// alpha. Everything else is passed through unchanged.
pub fn prepare_for_target(image: DynamicImage, target: &TargetFormat) -> DynamicImage {
    let color = image.color();

    if target.is_opaque() {
        return match color {
            ColorType::Rgb8 | ColorType::L8 => image,
            ColorType::L16 => DynamicImage::ImageLuma8(image.to_luma8()),
            _ => DynamicImage::ImageRgb8(image.to_rgb8()),
        };
    }

    if target.requires_8bit() && color.bytes_per_pixel() > color.channel_count() {
        return if color.has_alpha() {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };
    }

    image
}
