//! Synthetic DNG files for tests.

use std::io::Cursor;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

const TAG_NEW_SUBFILE_TYPE: u16 = 254;
const TAG_CFA_REPEAT_PATTERN_DIM: u16 = 33421;
const TAG_CFA_PATTERN: u16 = 33422;
const TAG_DNG_VERSION: u16 = 50706;
const TAG_WHITE_LEVEL: u16 = 50717;
const PHOTOMETRIC_CFA: u16 = 32803;
const COMPRESSION_JPEG: u16 = 7;

/// Sample value at `x`, `y` of the synthetic sensor (12 bit).
pub fn sensor_sample(x: u32, y: u32) -> u16 {
    (64 + (x * 97 + y * 131) % 3900) as u16
}

/// Build a little-endian DNG with an RGGB 12-bit sensor of `width` x `height`.
///
/// With `broken_preview`, IFD0 is a reduced-resolution preview that claims
/// JPEG compression over bytes that are not JPEG, and the sensor data
/// follows in IFD1.
pub fn synthetic_dng(width: u32, height: u32, broken_preview: bool) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor).unwrap();

        if broken_preview {
            let (w, h) = (width / 2, height / 2);
            let mut preview = encoder.new_image::<colortype::RGB8>(w, h).unwrap();
            let dir = preview.encoder();
            dir.write_tag(Tag::from_u16_exhaustive(TAG_NEW_SUBFILE_TYPE), 1u32)
                .unwrap();
            dir.write_tag(Tag::Compression, COMPRESSION_JPEG).unwrap();
            write_camera_tags(dir);
            let garbage: Vec<u8> = (0..w * h * 3).map(|i| (i % 7) as u8).collect();
            preview.write_data(&garbage).unwrap();
        }

        let mut raw = encoder
            .new_image::<colortype::Gray16>(width, height)
            .unwrap();
        let dir = raw.encoder();
        dir.write_tag(Tag::from_u16_exhaustive(TAG_NEW_SUBFILE_TYPE), 0u32)
            .unwrap();
        dir.write_tag(Tag::PhotometricInterpretation, PHOTOMETRIC_CFA)
            .unwrap();
        dir.write_tag(
            Tag::from_u16_exhaustive(TAG_CFA_REPEAT_PATTERN_DIM),
            &[2u16, 2][..],
        )
        .unwrap();
        dir.write_tag(Tag::from_u16_exhaustive(TAG_CFA_PATTERN), &[0u8, 1, 1, 2][..])
            .unwrap();
        dir.write_tag(Tag::from_u16_exhaustive(TAG_WHITE_LEVEL), 4095u32)
            .unwrap();
        if !broken_preview {
            write_camera_tags(dir);
        }

        let samples: Vec<u16> = (0..height)
            .flat_map(|y| (0..width).map(move |x| sensor_sample(x, y)))
            .collect();
        raw.write_data(&samples).unwrap();
    }
    cursor.into_inner()
}

fn write_camera_tags<W: std::io::Write + std::io::Seek, K: tiff::encoder::TiffKind>(
    dir: &mut tiff::encoder::DirectoryEncoder<'_, W, K>,
) {
    dir.write_tag(Tag::from_u16_exhaustive(TAG_DNG_VERSION), &[1u8, 4, 0, 0][..])
        .unwrap();
    dir.write_tag(Tag::Make, "Recast").unwrap();
    dir.write_tag(Tag::Model, "Synthetic Sensor").unwrap();
}
