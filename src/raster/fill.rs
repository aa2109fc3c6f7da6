//! Whole-bitmap and per-pixel operators

use serde::{Deserialize, Serialize};

use crate::bitmap::{has_storage, try_accelerate, AccelRequest, Bitmap, RowLayout};
use crate::combine::{dispatch, Combine, Strategy};
use crate::geom::Rect;
use crate::mode::{BlitMode, Operator};
use crate::pixel::{
    alpha as alpha_channel, average, channels, mix_quarter, mix_three_quarters, pack_clamped, Pixel, ALPHA_MASK,
    RGB_MASK,
};

use super::{alpha_weight, to_fixed};

/// Run `f` on each row of `rect` clipped to `dest`, top to bottom
fn for_each_row(dest: &mut dyn Bitmap, rect: Rect, mut f: impl FnMut(&mut [Pixel])) {
    let rect = rect.clip_to(dest.width(), dest.height());
    if rect.is_empty() || !has_storage(dest) {
        return;
    }
    let rows = RowLayout::at(dest, rect.x, rect.y);
    let w = rect.w as usize;
    let bits = dest.bits_mut();
    for i in 0..rect.h {
        let start = rows.row(i);
        f(&mut bits[start..start + w]);
    }
}

fn overwrite(_dest: Pixel, color: Pixel) -> Pixel {
    color
}

/// Whole-pixel COPY at one of the four packed weights
fn packed_copy(weight: i32) -> Option<fn(Pixel, Pixel) -> Pixel> {
    match weight {
        256 => Some(overwrite),
        128 => Some(average),
        64 => Some(mix_quarter),
        192 => Some(mix_three_quarters),
        _ => None,
    }
}

/// Overwrite every pixel of `dest` with `color`
pub fn clear(dest: &mut dyn Bitmap, color: Pixel) {
    if try_accelerate(dest, &mut AccelRequest::Clear { color }) {
        return;
    }
    let rect = Rect::new(0, 0, dest.width(), dest.height());
    for_each_row(dest, rect, |row| row.fill(color));
}

/// Fill `rect` with `color` through the combine operator for `mode`.
///
/// With the source-alpha flag, `alpha` is scaled by the color's own alpha
/// first. The color's alpha channel is what gets written into `dest`.
pub fn fill_rect(dest: &mut dyn Bitmap, rect: Rect, color: Pixel, alpha: f32, mode: BlitMode) {
    let mut request = AccelRequest::FillRect {
        rect,
        color,
        alpha,
        mode,
    };
    if try_accelerate(dest, &mut request) {
        return;
    }

    let alpha = if mode.uses_source_alpha() {
        alpha * alpha_channel(color) as f32 / 255.0
    } else {
        alpha
    };
    let ia = alpha_weight(alpha);
    if ia <= 0 {
        log::trace!("fill_rect with zero weight");
        return;
    }

    if mode.operator() == Operator::Copy {
        if let Some(mix) = packed_copy(ia) {
            for_each_row(dest, rect, |row| {
                for p in row {
                    *p = mix(*p, color);
                }
            });
            return;
        }
    }

    let Some(strategy) = Strategy::constant(mode, ia, false) else {
        return;
    };
    let (r, g, b, a) = channels(color);
    dispatch!(strategy, |c| for_each_row(dest, rect, |row| {
        for p in row {
            c.apply(p, r, g, b, a, ia);
        }
    }));
}

/// Linear color ramp over a rectangle
///
/// Channels are `(r, g, b, a)` in 0.0..=1.0 at the top-left corner of the
/// rectangle, with per-pixel slopes along x and y. Alpha drives the blend
/// weight of each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gradient {
    pub start: [f32; 4],
    pub dx: [f32; 4],
    pub dy: [f32; 4],
}

impl Gradient {
    /// Constant color
    pub const fn solid(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            start: [r, g, b, a],
            dx: [0.0; 4],
            dy: [0.0; 4],
        }
    }

    pub const fn with_dx(mut self, dx: [f32; 4]) -> Self {
        self.dx = dx;
        self
    }

    pub const fn with_dy(mut self, dy: [f32; 4]) -> Self {
        self.dy = dy;
        self
    }
}

/// Channel scales: color to 0..=255, alpha to a 0..=256 weight
const GRADIENT_SCALE: [f64; 4] = [255.0, 255.0, 255.0, 256.0];

/// Rasterize `gradient` into `rect`.
///
/// The start color is shifted by the slopes for any part of `rect` clipped
/// off the top or left edge, so the visible ramp does not move.
pub fn grad_rect(dest: &mut dyn Bitmap, rect: Rect, gradient: &Gradient, mode: BlitMode) {
    let clipped = rect.clip_to(dest.width(), dest.height());
    if clipped.is_empty() {
        log::trace!("grad_rect clipped away");
        return;
    }
    let (skip_x, skip_y) = (f64::from(clipped.x - rect.x), f64::from(clipped.y - rect.y));

    let mut start = [0i32; 4];
    let mut dx = [0i32; 4];
    let mut dy = [0i32; 4];
    for k in 0..4 {
        let scale = GRADIENT_SCALE[k];
        let sx = f64::from(gradient.dx[k]) * scale;
        let sy = f64::from(gradient.dy[k]) * scale;
        start[k] = to_fixed(f64::from(gradient.start[k]) * scale + skip_x * sx + skip_y * sy);
        dx[k] = to_fixed(sx);
        dy[k] = to_fixed(sy);
    }

    // Channels may leave 0..=255 along the ramp, so COPY saturates
    let Some(strategy) = Strategy::constant(mode, 256, true) else {
        return;
    };
    dispatch!(strategy, |c| {
        let mut row_start = start;
        for_each_row(dest, clipped, |row| {
            let mut cur = row_start;
            for p in row {
                let weight = (cur[3] >> 16).clamp(0, 256);
                c.apply(p, cur[0] >> 16, cur[1] >> 16, cur[2] >> 16, weight, weight);
                for (v, d) in cur.iter_mut().zip(dx) {
                    *v = v.wrapping_add(d);
                }
            }
            for (v, d) in row_start.iter_mut().zip(dy) {
                *v = v.wrapping_add(d);
            }
        });
    });
}

/// Per channel `clamp((c * scale + add) >> 8)` with both factors taken
/// as 8.8 fixed point. Arrays are `(r, g, b, a)`.
pub fn multiply_add_rect(dest: &mut dyn Bitmap, rect: Rect, scale: [f32; 4], add: [f32; 4]) {
    let fx = |v: f32| (v * 256.0) as i32;
    let (sr, sg, sb, sa) = (fx(scale[0]), fx(scale[1]), fx(scale[2]), fx(scale[3]));
    let (ar, ag, ab, aa) = (fx(add[0]), fx(add[1]), fx(add[2]), fx(add[3]));
    for_each_row(dest, rect, |row| {
        for p in row {
            let (r, g, b, a) = channels(*p);
            *p = pack_clamped(
                (r * sr + ar) >> 8,
                (g * sg + ag) >> 8,
                (b * sb + ab) >> 8,
                (a * sa + aa) >> 8,
            );
        }
    });
}

/// `p = (p & mask) | or_bits` over `rect`
pub fn clear_rect(dest: &mut dyn Bitmap, rect: Rect, mask: Pixel, or_bits: Pixel) {
    for_each_row(dest, rect, |row| {
        for p in row {
            *p = (*p & mask) | or_bits;
        }
    });
}

/// Call `f` on every pixel of `rect`, row by row
pub fn process_rect(dest: &mut dyn Bitmap, rect: Rect, mut f: impl FnMut(&mut Pixel)) {
    for_each_row(dest, rect, |row| row.iter_mut().for_each(&mut f));
}

/// Color-key the whole bitmap: pixels whose RGB equals the RGB of `key`
/// become fully transparent, all others fully opaque. RGB is preserved.
pub fn set_alpha_from_color_mask(dest: &mut dyn Bitmap, key: Pixel) {
    let key = key & RGB_MASK;
    let rect = Rect::new(0, 0, dest.width(), dest.height());
    for_each_row(dest, rect, |row| {
        for p in row {
            if *p & RGB_MASK == key {
                *p &= RGB_MASK;
            } else {
                *p |= ALPHA_MASK;
            }
        }
    });
}

/// Read one pixel; `None` outside the bitmap
///
/// Takes `&mut` because an acceleration hook may service the read.
pub fn get_pixel(bm: &mut dyn Bitmap, x: i32, y: i32) -> Option<Pixel> {
    let mut request = AccelRequest::GetPixel { x, y, pixel: 0 };
    if try_accelerate(bm, &mut request) {
        if let AccelRequest::GetPixel { pixel, .. } = request {
            return Some(pixel);
        }
    }
    if x < 0 || y < 0 || x >= bm.width() || y >= bm.height() || !has_storage(bm) {
        return None;
    }
    let i = RowLayout::at(bm, x, y).row(0);
    bm.bits().get(i).copied()
}

/// Combine `color` into one pixel at constant `alpha`
pub fn put_pixel(dest: &mut dyn Bitmap, x: i32, y: i32, color: Pixel, alpha: f32, mode: BlitMode) {
    let mut request = AccelRequest::PutPixel {
        x,
        y,
        color,
        alpha,
        mode,
    };
    if try_accelerate(dest, &mut request) {
        return;
    }
    if x < 0 || y < 0 || x >= dest.width() || y >= dest.height() || !has_storage(dest) {
        return;
    }
    let i = RowLayout::at(dest, x, y).row(0);
    let ia = alpha_weight(alpha);
    let Some(p) = dest.bits_mut().get_mut(i) else {
        return;
    };

    if mode.operator() == Operator::Copy {
        if let Some(mix) = packed_copy(ia) {
            *p = mix(*p, color);
            return;
        }
    }
    if let Some(strategy) = Strategy::constant(mode, ia, false) {
        let (r, g, b, a) = channels(color);
        strategy.with_dyn(|c| c.apply(p, r, g, b, a, ia));
    }
}
