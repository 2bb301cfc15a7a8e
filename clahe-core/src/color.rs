//! Colour-space adapter between interleaved 8-bit images and intensity planes.
//!
//! - `Lab`: sRGB -> CIE L*a*b* (D65). Only L* is enhanced; a*, b* are kept as
//!   floats and recombined untouched.
//! - `Rgb`: each of R, G, B is enhanced on its own.
//! - `Luma`: BT.601 grayscale.
//!
//! Channels past the third (alpha) are never read or written by the colour paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::plane::{Plane, Sample};

/// Which intensity plane(s) CLAHE is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Lab,
    Rgb,
    Luma,
}

impl ColorMode {
    pub fn all_names() -> &'static [&'static str] {
        &["lab", "rgb", "luma"]
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorMode::Lab => "lab",
            ColorMode::Rgb => "rgb",
            ColorMode::Luma => "luma",
        };
        f.write_str(name)
    }
}

impl FromStr for ColorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lab" => Ok(ColorMode::Lab),
            "rgb" => Ok(ColorMode::Rgb),
            "luma" | "gray" | "grey" => Ok(ColorMode::Luma),
            other => Err(Error::invalid(format!(
                "unknown color mode '{}'. Available: {}",
                other,
                ColorMode::all_names().join(", ")
            ))),
        }
    }
}

// =============================================================================
// sRGB transfer and CIE L*a*b* (D65)
// =============================================================================

const D65_X: f32 = 0.95047;
const D65_Y: f32 = 1.00000;
const D65_Z: f32 = 1.08883;

const SRGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

const XYZ_TO_SRGB: [[f32; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

#[inline]
fn srgb_to_linear(v: u8) -> f32 {
    let c = v as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

#[inline]
fn mat3(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

#[inline]
fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

#[inline]
fn lab_f_inv(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// sRGB bytes to `[L*, a*, b*]` with L* in 0..=100.
pub fn srgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let lin = rgb.map(srgb_to_linear);
    let [x, y, z] = mat3(&SRGB_TO_XYZ, lin);
    let fx = lab_f(x / D65_X);
    let fy = lab_f(y / D65_Y);
    let fz = lab_f(z / D65_Z);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// `[L*, a*, b*]` back to sRGB bytes. Out-of-gamut colours are clamped.
pub fn lab_to_srgb(lab: [f32; 3]) -> [u8; 3] {
    let [l, a, b] = lab;
    let fy = (l + 16.0) / 116.0;
    let fx = a / 500.0 + fy;
    let fz = fy - b / 200.0;
    let xyz = [
        D65_X * lab_f_inv(fx),
        D65_Y * lab_f_inv(fy),
        D65_Z * lab_f_inv(fz),
    ];
    mat3(&XYZ_TO_SRGB, xyz).map(linear_to_srgb)
}

/// L* (0..=100) to an 8-bit level, as OpenCV's 8-bit Lab does.
#[inline]
fn lightness_to_level(l: f32) -> u8 {
    (l * 255.0 / 100.0 + 0.5).clamp(0.0, 255.0) as u8
}

#[inline]
fn level_to_lightness(v: u8) -> f32 {
    v as f32 * 100.0 / 255.0
}

// =============================================================================
// Plane extraction / reconstitution
// =============================================================================

fn check_layout(
    len: usize,
    channels: usize,
    width: u32,
    height: u32,
    min_channels: usize,
) -> Result<()> {
    if channels < min_channels {
        return Err(Error::invalid(format!(
            "need at least {} channels, got {}",
            min_channels, channels
        )));
    }
    let expected = width as usize * height as usize * channels;
    if len != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// L* plane of an interleaved sRGB image, with the chroma needed to rebuild it.
#[derive(Debug, Clone)]
pub struct LabSplit {
    pub lightness: Plane<u8>,
    chroma: Vec<[f32; 2]>,
}

impl LabSplit {
    /// Convert every pixel of `pixels` (`channels` >= 3, RGB first) to Lab.
    pub fn new(pixels: &[u8], channels: usize, width: u32, height: u32) -> Result<Self> {
        check_layout(pixels.len(), channels, width, height, 3)?;

        let (levels, chroma): (Vec<u8>, Vec<[f32; 2]>) = pixels
            .chunks_exact(channels)
            .map(|px| {
                let [l, a, b] = srgb_to_lab([px[0], px[1], px[2]]);
                (lightness_to_level(l), [a, b])
            })
            .unzip();

        Ok(Self {
            lightness: Plane::new(width, height, levels)?,
            chroma,
        })
    }

    /// Write `lightness` combined with the stored a*, b* back into the RGB
    /// channels of `pixels`. Other channels are left as they are.
    pub fn merge_into(
        &self,
        lightness: &Plane<u8>,
        pixels: &mut [u8],
        channels: usize,
    ) -> Result<()> {
        let (width, height) = self.lightness.dimensions();
        check_layout(pixels.len(), channels, width, height, 3)?;
        if lightness.dimensions() != (width, height) {
            return Err(Error::DimensionMismatch {
                expected: self.chroma.len(),
                actual: lightness.as_slice().len(),
            });
        }

        for ((px, &level), &[a, b]) in pixels
            .chunks_exact_mut(channels)
            .zip(lightness.as_slice())
            .zip(&self.chroma)
        {
            let rgb = lab_to_srgb([level_to_lightness(level), a, b]);
            px[..3].copy_from_slice(&rgb);
        }
        Ok(())
    }
}

/// Copy channel `index` of an interleaved buffer into a plane.
pub fn extract_channel<T: Sample>(
    pixels: &[T],
    channels: usize,
    index: usize,
    width: u32,
    height: u32,
) -> Result<Plane<T>> {
    check_layout(pixels.len(), channels, width, height, index + 1)?;
    let data = pixels.chunks_exact(channels).map(|px| px[index]).collect();
    Plane::new(width, height, data)
}

/// Overwrite channel `index` of an interleaved buffer with `plane`.
pub fn insert_channel<T: Sample>(
    plane: &Plane<T>,
    pixels: &mut [T],
    channels: usize,
    index: usize,
) -> Result<()> {
    let (width, height) = plane.dimensions();
    check_layout(pixels.len(), channels, width, height, index + 1)?;
    for (px, &v) in pixels.chunks_exact_mut(channels).zip(plane.as_slice()) {
        px[index] = v;
    }
    Ok(())
}

/// BT.601 grayscale with OpenCV's integer weights:
/// gray = (R*4899 + G*9617 + B*1868 + 8192) >> 14
pub fn rgb_to_luma(pixels: &[u8], channels: usize, width: u32, height: u32) -> Result<Plane<u8>> {
    check_layout(pixels.len(), channels, width, height, 3)?;
    let gray = pixels
        .chunks_exact(channels)
        .map(|px| {
            let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
            ((r * 4899 + g * 9617 + b * 1868 + 8192) >> 14).min(255) as u8
        })
        .collect();
    Plane::new(width, height, gray)
}
