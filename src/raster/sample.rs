//! Fixed-point sampling filters
//!
//! Fractions are the low 16 bits of a 16.16 coordinate. Weights always sum
//! to 65536, so every result stays within 0..=255.

use crate::pixel::{channels, Pixel};

use super::FIXED_ONE;

/// Channel quadruple `(r, g, b, a)`
pub(crate) type Rgba = (i32, i32, i32, i32);

/// 2x2 bilinear interpolation
///
/// `p00`/`p10` are the left/right pixels of the upper row, `p01`/`p11` the
/// row below.
#[inline]
pub(crate) fn bilinear(p00: Pixel, p10: Pixel, p01: Pixel, p11: Pixel, xfrac: i32, yfrac: i32) -> Rgba {
    let f11 = ((xfrac as u32 * yfrac as u32) >> 16) as i32;
    let f01 = yfrac - f11;
    let f10 = xfrac - f11;
    let f00 = FIXED_ONE - yfrac - f10;

    let (r00, g00, b00, a00) = channels(p00);
    let (r10, g10, b10, a10) = channels(p10);
    let (r01, g01, b01, a01) = channels(p01);
    let (r11, g11, b11, a11) = channels(p11);
    (
        (r00 * f00 + r10 * f10 + r01 * f01 + r11 * f11) >> 16,
        (g00 * f00 + g10 * f10 + g01 * f01 + g11 * f11) >> 16,
        (b00 * f00 + b10 * f10 + b01 * f01 + b11 * f11) >> 16,
        (a00 * f00 + a10 * f10 + a01 * f01 + a11 * f11) >> 16,
    )
}

/// 1-D interpolation from `p0` towards `p1`
#[inline]
pub(crate) fn linear(p0: Pixel, p1: Pixel, frac: i32) -> Rgba {
    let f0 = FIXED_ONE - frac;
    let (r0, g0, b0, a0) = channels(p0);
    let (r1, g1, b1, a1) = channels(p1);
    (
        (r0 * f0 + r1 * frac) >> 16,
        (g0 * f0 + g1 * frac) >> 16,
        (b0 * f0 + b1 * frac) >> 16,
        (a0 * f0 + a1 * frac) >> 16,
    )
}

// ============================================================================
// Box kernel
// ============================================================================

/// Square downsampling kernel, 3x3 or 5x5, weights in 16.16
///
/// The centre tap weighs exactly 65536; the others fall off with distance.
#[derive(Debug, Clone)]
pub(crate) struct BoxKernel {
    size: usize,
    weights: [i32; 25],
}

impl BoxKernel {
    /// Kernel for a 16.16 step of `step` (the larger axis step)
    pub(crate) fn for_step(step: i32) -> Self {
        let size: usize = if step > 3 * FIXED_ONE { 5 } else { 3 };
        let center = (size / 2) as i32;
        let reach = f64::from(step) / f64::from(FIXED_ONE) - 1.0;
        let mut weights = [0; 25];
        for y in 0..size {
            for x in 0..size {
                let (dx, dy) = (x as i32 - center, y as i32 - center);
                weights[y * size + x] = if dx == 0 && dy == 0 {
                    FIXED_ONE
                } else {
                    let v = reach / f64::from(dx * dx + dy * dy).sqrt();
                    (v.clamp(0.0, 1.0) * f64::from(FIXED_ONE)) as i32
                };
            }
        }
        Self { size, weights }
    }

    #[inline]
    pub(crate) const fn size(&self) -> usize {
        self.size
    }

    /// Offset of the first tap from the sample position
    #[inline]
    pub(crate) const fn start(&self) -> i32 {
        -((self.size / 2) as i32)
    }

    /// Row `ky` of weights
    #[inline]
    pub(crate) fn row(&self, ky: usize) -> &[i32] {
        &self.weights[ky * self.size..(ky + 1) * self.size]
    }
}

/// Accumulates weighted taps
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TapSum {
    r: i32,
    g: i32,
    b: i32,
    a: i32,
    weight: i32,
}

impl TapSum {
    #[inline]
    pub(crate) fn add(&mut self, p: Pixel, w: i32) {
        let (r, g, b, a) = channels(p);
        self.r += r * w;
        self.g += g * w;
        self.b += b * w;
        self.a += a * w;
        self.weight += w;
    }

    /// Weighted average, or `None` when no tap landed in bounds
    #[inline]
    pub(crate) fn average(&self) -> Option<Rgba> {
        (self.weight > 0).then(|| {
            (
                self.r / self.weight,
                self.g / self.weight,
                self.b / self.weight,
                self.a / self.weight,
            )
        })
    }
}
