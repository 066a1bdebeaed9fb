//! Developing raw sensor data into an 8-bit sRGB raster.
//!
//! The chain is deliberately short: black/white level scaling with camera
//! white balance, bilinear demosaic through `bayer`, then the sRGB transfer
//! curve. No camera color matrix is applied.

use bayer::{BayerDepth, Demosaic, RasterDepth, RasterMut, CFA};
use image::{DynamicImage, RgbImage};
use std::io::Cursor;

use crate::error::DevelopError;

/// 2x2 Bayer color filter layouts, named from the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaPattern {
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl CfaPattern {
    /// Build a pattern from the colors at (0,0), (0,1), (1,0), (1,1).
    ///
    /// Colors are 0 = red, 1 = green, 2 = blue; 3 is the second green some
    /// decoders report separately.
    pub fn from_colors(colors: [usize; 4]) -> Option<Self> {
        let normalized = colors.map(|c| if c == 3 { 1 } else { c });
        match normalized {
            [0, 1, 1, 2] => Some(CfaPattern::Rggb),
            [2, 1, 1, 0] => Some(CfaPattern::Bggr),
            [1, 0, 2, 1] => Some(CfaPattern::Grbg),
            [1, 2, 0, 1] => Some(CfaPattern::Gbrg),
            _ => None,
        }
    }

    /// Color channel (0 = R, 1 = G, 2 = B) of the photosite at `row`, `col`.
    pub fn color_at(self, row: usize, col: usize) -> usize {
        let colors = match self {
            CfaPattern::Rggb => [0, 1, 1, 2],
            CfaPattern::Bggr => [2, 1, 1, 0],
            CfaPattern::Grbg => [1, 0, 2, 1],
            CfaPattern::Gbrg => [1, 2, 0, 1],
        };
        colors[(row % 2) * 2 + col % 2]
    }

    fn to_bayer(self) -> CFA {
        match self {
            CfaPattern::Rggb => CFA::RGGB,
            CfaPattern::Bggr => CFA::BGGR,
            CfaPattern::Grbg => CFA::GRBG,
            CfaPattern::Gbrg => CFA::GBRG,
        }
    }
}

/// How samples are laid out in a [`SensorFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLayout {
    /// One sample per pixel behind a Bayer filter
    Bayer(CfaPattern),
    /// Three interleaved samples per pixel (linear DNG)
    Rgb,
}

/// Cropped sensor samples plus the levels needed to develop them.
#[derive(Debug, Clone)]
pub struct SensorFrame {
    /// Active-area width in pixels
    pub width: usize,
    /// Active-area height in pixels
    pub height: usize,
    /// Filter pattern, or interleaved RGB
    pub layout: SensorLayout,
    /// Row-major samples, `width * height` of them (three per pixel for RGB)
    pub samples: Vec<u16>,
    /// Per-channel black level (R, G, B)
    pub black: [f32; 3],
    /// Per-channel saturation level (R, G, B)
    pub white: [f32; 3],
    /// White balance multipliers (R, G, B), smallest is 1.0
    pub wb: [f32; 3],
}

impl SensorFrame {
    /// Take the active area out of a decoded raw file.
    pub fn from_rawloader(raw: rawloader::RawImage) -> Result<Self, DevelopError> {
        let [top, right, bottom, left] = raw.crops;
        let width = raw.width.saturating_sub(left + right);
        let height = raw.height.saturating_sub(top + bottom);
        if width == 0 || height == 0 {
            return Err(DevelopError::EmptyFrame { width, height });
        }

        let layout = match raw.cpp {
            1 => {
                if raw.cfa.width != 2 || raw.cfa.height != 2 {
                    return Err(DevelopError::UnsupportedCfa(raw.cfa.name.clone()));
                }
                let colors = [
                    raw.cfa.color_at(top, left),
                    raw.cfa.color_at(top, left + 1),
                    raw.cfa.color_at(top + 1, left),
                    raw.cfa.color_at(top + 1, left + 1),
                ];
                let pattern = CfaPattern::from_colors(colors)
                    .ok_or_else(|| DevelopError::UnsupportedCfa(raw.cfa.name.clone()))?;
                SensorLayout::Bayer(pattern)
            }
            3 => SensorLayout::Rgb,
            other => return Err(DevelopError::UnsupportedSamples(other)),
        };

        let (samples, black, white) = match raw.data {
            rawloader::RawImageData::Integer(values) => {
                let levels = |l: [u16; 4]| [f32::from(l[0]), f32::from(l[1]), f32::from(l[2])];
                (values, levels(raw.blacklevels), levels(raw.whitelevels))
            }
            // Float data is normalized to 0..1 already
            rawloader::RawImageData::Float(values) => {
                let scaled = values
                    .iter()
                    .map(|&v| (v.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16)
                    .collect();
                (scaled, [0.0; 3], [f32::from(u16::MAX); 3])
            }
        };

        let samples = crop_samples(
            &samples,
            raw.width * raw.cpp,
            (top, left * raw.cpp),
            (height, width * raw.cpp),
        )?;

        Ok(Self {
            width,
            height,
            layout,
            samples,
            black,
            white,
            wb: white_balance(raw.wb_coeffs),
        })
    }

    /// Run the development chain.
    pub fn develop(&self) -> Result<DynamicImage, DevelopError> {
        let channels = match self.layout {
            SensorLayout::Bayer(_) => 1,
            SensorLayout::Rgb => 3,
        };
        let expected = self.width * self.height * channels;
        if self.samples.len() != expected {
            return Err(DevelopError::BufferSize {
                expected,
                actual: self.samples.len(),
            });
        }

        let linear: Vec<u16> = match self.layout {
            SensorLayout::Bayer(pattern) => {
                let normalized: Vec<u8> = self
                    .samples
                    .iter()
                    .enumerate()
                    .flat_map(|(i, &s)| {
                        let color = pattern.color_at(i / self.width, i % self.width);
                        self.normalize(s, color).to_le_bytes()
                    })
                    .collect();
                self.demosaic(&normalized, pattern)?
            }
            SensorLayout::Rgb => self
                .samples
                .iter()
                .enumerate()
                .map(|(i, &s)| self.normalize(s, i % 3))
                .collect(),
        };

        let lut = srgb_lut();
        let pixels: Vec<u8> = linear.iter().map(|&v| lut[usize::from(v)]).collect();

        RgbImage::from_raw(self.width as u32, self.height as u32, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or(DevelopError::BufferSize {
                expected,
                actual: linear.len(),
            })
    }

    /// Map a raw sample to linear 16-bit with white balance applied.
    fn normalize(&self, sample: u16, color: usize) -> u16 {
        let black = self.black[color];
        let range = (self.white[color] - black).max(1.0);
        let value = (f32::from(sample) - black).max(0.0) / range * self.wb[color];
        (value.min(1.0) * f32::from(u16::MAX)).round() as u16
    }

    fn demosaic(&self, bayer_bytes: &[u8], pattern: CfaPattern) -> Result<Vec<u16>, DevelopError> {
        let mut output = vec![0u8; self.width * self.height * 3 * 2];
        {
            let mut raster = RasterMut::new(self.width, self.height, RasterDepth::Depth16, &mut output);
            bayer::run_demosaic(
                &mut Cursor::new(bayer_bytes),
                BayerDepth::Depth16LE,
                pattern.to_bayer(),
                Demosaic::Linear,
                &mut raster,
            )
            .map_err(|e| DevelopError::Demosaic(format!("{e:?}")))?;
        }

        // Depth16 rasters are written in native byte order
        Ok(output
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect())
    }
}

/// Cut a `rows x cols` window starting at `origin` out of a row-major buffer.
fn crop_samples(
    samples: &[u16],
    stride: usize,
    origin: (usize, usize),
    size: (usize, usize),
) -> Result<Vec<u16>, DevelopError> {
    let (top, left) = origin;
    let (rows, cols) = size;
    let expected = (top + rows) * stride;
    if samples.len() < expected || left + cols > stride {
        return Err(DevelopError::BufferSize {
            expected,
            actual: samples.len(),
        });
    }

    let mut cropped = Vec::with_capacity(rows * cols);
    for row in samples.chunks_exact(stride).skip(top).take(rows) {
        cropped.extend_from_slice(&row[left..left + cols]);
    }
    Ok(cropped)
}

/// Camera white balance normalized so the weakest channel is 1.0.
fn white_balance(coeffs: [f32; 4]) -> [f32; 3] {
    let sane = |c: f32| if c.is_finite() && c > 0.0 { c } else { 1.0 };
    let wb = [sane(coeffs[0]), sane(coeffs[1]), sane(coeffs[2])];
    let min = wb.iter().copied().fold(f32::INFINITY, f32::min);
    wb.map(|c| c / min)
}

fn srgb_lut() -> Vec<u8> {
    (0..=u16::MAX)
        .map(|v| {
            let linear = f32::from(v) / f32::from(u16::MAX);
            let encoded = if linear <= 0.003_130_8 {
                linear * 12.92
            } else {
                1.055 * linear.powf(1.0 / 2.4) - 0.055
            };
            (encoded.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect()
}
