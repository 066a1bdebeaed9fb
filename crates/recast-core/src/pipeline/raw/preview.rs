//! Embedded preview extraction from TIFF-based raw containers (DNG).
//!
//! Walks the IFD chain, keeps the largest reduced-resolution image and reads
//! it either as a JPEG stream or as an uncompressed 8-bit RGB bitmap.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::error::ThumbnailError;
use crate::types::DecodePath;

const COMPRESSION_NONE: u32 = 1;
const COMPRESSION_OLD_JPEG: u32 = 6;
const COMPRESSION_JPEG: u32 = 7;

const TAG_NEW_SUBFILE_TYPE: u16 = 254;
const TAG_JPEG_INTERCHANGE_FORMAT: u16 = 513;
const TAG_JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 514;

/// Bit 0 of NewSubfileType: reduced-resolution version of another image.
const SUBFILE_REDUCED_RESOLUTION: u32 = 1;

type TiffDecoder<'a> = Decoder<Cursor<&'a [u8]>>;

/// A preview image found inside a raw container.
#[derive(Debug)]
pub enum Thumbnail {
    /// Baseline JPEG stream
    Jpeg(Vec<u8>),
    /// Uncompressed RGB pixels
    Bitmap(RgbImage),
}

impl Thumbnail {
    /// Turn the preview into a raster.
    pub fn into_image(self) -> Result<(DynamicImage, DecodePath), ThumbnailError> {
        match self {
            Thumbnail::Jpeg(data) => image::load_from_memory_with_format(&data, ImageFormat::Jpeg)
                .map(|img| (img, DecodePath::EmbeddedJpeg))
                .map_err(|e| ThumbnailError::Corrupt(e.to_string())),
            Thumbnail::Bitmap(rgb) => {
                Ok((DynamicImage::ImageRgb8(rgb), DecodePath::EmbeddedBitmap))
            }
        }
    }
}

/// Find the largest usable preview in a TIFF-structured raw file.
pub fn extract_preview(bytes: &[u8]) -> Result<Thumbnail, ThumbnailError> {
    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(corrupt)?;
    let mut best: Option<(u64, Thumbnail)> = None;
    let mut rejected: Option<ThumbnailError> = None;

    loop {
        match read_directory(&mut decoder, bytes) {
            Ok(Some((area, thumb))) => {
                if best.as_ref().map_or(true, |(best_area, _)| area > *best_area) {
                    best = Some((area, thumb));
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::trace!("Skipping preview candidate: {e}");
                rejected.get_or_insert(e);
            }
        }

        if !decoder.more_images() {
            break;
        }
        // The raw IFD itself often uses layouts the TIFF decoder refuses.
        if let Err(e) = decoder.next_image() {
            tracing::trace!("Stopping IFD walk: {e}");
            break;
        }
    }

    match best {
        Some((_, thumb)) => Ok(thumb),
        None => Err(rejected.unwrap_or(ThumbnailError::Missing)),
    }
}

/// Read the current IFD if it is a preview. Returns its pixel area with it.
fn read_directory(
    decoder: &mut TiffDecoder<'_>,
    bytes: &[u8],
) -> Result<Option<(u64, Thumbnail)>, ThumbnailError> {
    let subfile = tag_u32(decoder, Tag::from_u16_exhaustive(TAG_NEW_SUBFILE_TYPE))?.unwrap_or(0);
    if subfile & SUBFILE_REDUCED_RESOLUTION == 0 {
        return Ok(None);
    }

    let (width, height) = decoder.dimensions().map_err(corrupt)?;
    let area = u64::from(width) * u64::from(height);
    let compression = tag_u32(decoder, Tag::Compression)?.unwrap_or(COMPRESSION_NONE);

    let thumb = match compression {
        COMPRESSION_JPEG | COMPRESSION_OLD_JPEG => {
            Thumbnail::Jpeg(jpeg_stream(decoder, bytes)?.to_vec())
        }
        COMPRESSION_NONE => match decoder.colortype().map_err(corrupt)? {
            ColorType::RGB(8) => match decoder.read_image().map_err(corrupt)? {
                DecodingResult::U8(pixels) => RgbImage::from_raw(width, height, pixels)
                    .map(Thumbnail::Bitmap)
                    .ok_or_else(|| ThumbnailError::Corrupt("bitmap size mismatch".into()))?,
                _ => return Err(ThumbnailError::Unsupported("non 8-bit bitmap".into())),
            },
            other => {
                return Err(ThumbnailError::Unsupported(format!(
                    "uncompressed {other:?}"
                )))
            }
        },
        other => {
            return Err(ThumbnailError::Unsupported(format!(
                "compression scheme {other}"
            )))
        }
    };

    Ok(Some((area, thumb)))
}

/// Locate the JPEG bytes of the current IFD inside the file buffer.
fn jpeg_stream<'a>(
    decoder: &mut TiffDecoder<'_>,
    bytes: &'a [u8],
) -> Result<&'a [u8], ThumbnailError> {
    let interchange = (
        tag_u64(decoder, TAG_JPEG_INTERCHANGE_FORMAT)?,
        tag_u64(decoder, TAG_JPEG_INTERCHANGE_FORMAT_LENGTH)?,
    );

    let (offset, length) = match interchange {
        (Some(offset), Some(length)) => (offset, length),
        _ => {
            let offsets = tag_u64_vec(decoder, Tag::StripOffsets)?;
            let counts = tag_u64_vec(decoder, Tag::StripByteCounts)?;
            match (offsets.as_slice(), counts.as_slice()) {
                ([offset], [length]) => (*offset, *length),
                _ => {
                    return Err(ThumbnailError::Unsupported(
                        "JPEG preview split across strips".into(),
                    ))
                }
            }
        }
    };

    let start = usize::try_from(offset).ok();
    let end = start.zip(usize::try_from(length).ok()).and_then(|(s, l)| s.checked_add(l));
    start
        .zip(end)
        .and_then(|(start, end)| bytes.get(start..end))
        .ok_or_else(|| ThumbnailError::Corrupt("preview data lies outside the file".into()))
}

fn tag_u32(decoder: &mut TiffDecoder<'_>, tag: Tag) -> Result<Option<u32>, ThumbnailError> {
    decoder
        .find_tag(tag)
        .map_err(corrupt)?
        .map(|value| value.into_u32().map_err(corrupt))
        .transpose()
}

fn tag_u64(decoder: &mut TiffDecoder<'_>, code: u16) -> Result<Option<u64>, ThumbnailError> {
    decoder
        .find_tag(Tag::from_u16_exhaustive(code))
        .map_err(corrupt)?
        .map(|value| value.into_u64().map_err(corrupt))
        .transpose()
}

fn tag_u64_vec(decoder: &mut TiffDecoder<'_>, tag: Tag) -> Result<Vec<u64>, ThumbnailError> {
    match decoder.find_tag(tag).map_err(corrupt)? {
        Some(value) => value.into_u64_vec().map_err(corrupt),
        None => Ok(Vec::new()),
    }
}

fn corrupt(e: impl std::fmt::Display) -> ThumbnailError {
    ThumbnailError::Corrupt(e.to_string())
}
