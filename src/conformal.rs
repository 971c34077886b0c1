use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::math::{Point3, TOLERANCE};

/// Accent color mixed into glowing texels (RGB, linear).
pub const GLOW_COLOR: [f64; 3] = [0.3, 0.6, 1.0];

/// Parameters for wrapping a flat decal plane onto a curved surface.
///
/// Each axis bends independently around its own cylinder: `radius_*` is the
/// cylinder radius and `strength_*` scales how much of the arc is used. The
/// defaults reproduce the curvature of a wide-radius tumbler front.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConformalSurfaceParams {
    pub radius_x: f64,
    pub strength_x: f64,
    pub radius_y: f64,
    pub strength_y: f64,
    /// Plane subdivisions per axis; more segments track the curve closer.
    pub segments: u32,
    /// When false the decal stays flat.
    pub enabled: bool,
}

impl Default for ConformalSurfaceParams {
    fn default() -> Self {
        Self {
            radius_x: 28.0,
            strength_x: 0.85,
            radius_y: 423.0,
            strength_y: 2.0,
            segments: 24,
            enabled: true,
        }
    }
}

/// Displaces one vertex of a flat decal plane onto the curved surface.
///
/// The X coordinate becomes an arc length on the X cylinder: the vertex
/// moves to the chord position and recedes by the sagitta. The Y axis keeps
/// its coordinate and contributes only its sagitta, so the decal holds its
/// height while the shell curves away. Both recessions push along -Z. UVs
/// are untouched by design; the texture stretches with the geometry.
#[must_use]
pub fn displace(p: &Point3, params: &ConformalSurfaceParams) -> Point3 {
    if !params.enabled {
        return *p;
    }

    let mut out = *p;

    if params.strength_x.abs() > 0.0 && params.radius_x > TOLERANCE {
        let angle = p.x / params.radius_x * params.strength_x;
        out.x = params.radius_x * angle.sin();
        out.z -= params.radius_x * (1.0 - angle.cos());
    }
    if params.strength_y.abs() > 0.0 && params.radius_y > TOLERANCE {
        let angle = p.y / params.radius_y * params.strength_y;
        out.z -= params.radius_y * (1.0 - angle.cos());
    }

    out
}

/// An RGBA decal image sampled in UV space.
#[derive(Debug, Clone)]
pub struct DecalTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecalTexture {
    /// Wraps a tightly packed RGBA buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DimensionMismatch`] if either dimension is zero
    /// or the buffer length does not match the dimensions.
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(TraceError::DimensionMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            }
            .into());
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-neighbor sample at normalized UV, clamped to the edges.
    /// Components come back in `0.0..=1.0`.
    #[must_use]
    pub fn sample(&self, u: f64, v: f64) -> [f64; 4] {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tex = |coord: f64, size: u32| -> u32 {
            let scaled = coord.clamp(0.0, 1.0) * f64::from(size);
            (scaled as u32).min(size - 1)
        };
        let x = tex(u, self.width);
        let y = tex(v, self.height);
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.pixels[i..i + 4];
        [
            f64::from(px[0]) / 255.0,
            f64::from(px[1]) / 255.0,
            f64::from(px[2]) / 255.0,
            f64::from(px[3]) / 255.0,
        ]
    }
}

/// Rec. 601 luma of a linear RGB texel.
#[must_use]
pub fn luminance(rgb: [f64; 3]) -> f64 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}

/// Shades one decal texel: the image is inverted to read as etched glass,
/// then blended toward the glow accent by `glow` (0 = plain, 1 = fully
/// lit). Alpha passes through.
#[must_use]
pub fn shade(texel: [f64; 4], glow: f64) -> [f64; 4] {
    let inverted = 1.0 - luminance([texel[0], texel[1], texel[2]]);
    let bw = [inverted, inverted, inverted];
    let glow = glow.clamp(0.0, 1.0);
    let mut out = [0.0; 4];
    for i in 0..3 {
        let lit = bw[i] + GLOW_COLOR[i] * 0.5;
        out[i] = bw[i] + (lit - bw[i]) * glow;
    }
    out[3] = texel[3];
    out
}
