//! Scaled blit
//!
//! Sampling positions are 16.16 fixed point and advance by pure integer
//! addition. Destination clipping is done on the same fixed-point walk, so
//! the clip and the sampler can never disagree about the first or last
//! sampled pixel.

use crate::bitmap::{has_storage, try_accelerate, AccelRequest, Bitmap, RowLayout};
use crate::combine::{dispatch, Combine, Strategy};
use crate::geom::{Rect, RectF};
use crate::mode::{BlitMode, Filter};
use crate::pixel::{average, channels, Pixel};

use super::sample::{bilinear, linear, BoxKernel, TapSum};
use super::{alpha_weight, blit, to_fixed, FIXED_ONE};

/// Steps at or above this (on both axes) switch bilinear to the box filter
const BOX_FILTER_MIN_STEP: f64 = 1.7;

/// Resample `src_rect` of `src` into `dst` on `dest`.
///
/// A negative `dst.w` / `dst.h` mirrors the blit on that axis.
pub fn scaled_blit(dest: &mut dyn Bitmap, src: &dyn Bitmap, dst: Rect, src_rect: RectF, alpha: f32, mode: BlitMode) {
    if alpha <= 0.0 || dst.w == 0 || dst.h == 0 {
        return;
    }
    let Rect {
        x: mut dst_x,
        y: mut dst_y,
        w: mut dst_w,
        h: mut dst_h,
    } = dst;
    let RectF {
        x: mut src_x,
        y: mut src_y,
        w: mut src_w,
        h: mut src_h,
    } = src_rect;
    let filter = mode.filter();

    // Unscaled and pixel aligned: a straight blit gives the same pixels
    if (src_w - dst_w as f32).abs() < 0.001 && (src_h - dst_h as f32).abs() < 0.001 {
        let aligned = |v: f32| (v - (v + 0.5).floor()).abs() < 0.03;
        if filter == Filter::Nearest || (aligned(src_x) && aligned(src_y)) {
            let sr = Rect::new((src_x + 0.5).floor() as i32, (src_y + 0.5).floor() as i32, dst_w, dst_h);
            blit(dest, src, dst_x, dst_y, Some(sr), alpha, mode);
            return;
        }
    }

    let mut request = AccelRequest::ScaledBlit {
        src,
        dst,
        src_rect,
        alpha,
        mode,
    };
    if try_accelerate(dest, &mut request) {
        return;
    }

    // Mirror requests become a walk from the far edge with a negative step
    if dst_w < 0 {
        dst_w = -dst_w;
        dst_x -= dst_w;
        src_x += src_w;
        src_w = -src_w;
    }
    if dst_h < 0 {
        dst_h = -dst_h;
        dst_y -= dst_h;
        src_y += src_h;
        src_h = -src_h;
    }

    let x_advance = f64::from(src_w) / f64::from(dst_w);
    let y_advance = f64::from(src_h) / f64::from(dst_h);
    let (mut src_x, mut src_y) = (f64::from(src_x), f64::from(src_y));

    if dst_x < 0 {
        src_x -= f64::from(dst_x) * x_advance;
        dst_w += dst_x;
        dst_x = 0;
    }
    if dst_y < 0 {
        src_y -= f64::from(dst_y) * y_advance;
        dst_h += dst_y;
        dst_y = 0;
    }
    dst_w = dst_w.min(dest.width() - dst_x);
    dst_h = dst_h.min(dest.height() - dst_y);
    if dst_w < 1 || dst_h < 1 {
        return;
    }

    let (Some(x_axis), Some(y_axis)) = (
        Axis::clip(to_fixed(src_x), to_fixed(x_advance), dst_x, dst_w, src.width()),
        Axis::clip(to_fixed(src_y), to_fixed(y_advance), dst_y, dst_h, src.height()),
    ) else {
        return;
    };

    let clip_right = ((src_x + f64::from(src_w.max(0.0))).ceil() as i32).min(src.width());
    let clip_bottom = ((src_y + f64::from(src_h.max(0.0))).ceil() as i32).min(src.height());
    if clip_right < 1 || clip_bottom < 1 || !has_storage(dest) || !has_storage(src) {
        return;
    }

    let walk = ScaleWalk {
        x: x_axis,
        y: y_axis,
        clip_right,
        clip_bottom,
        dst: RowLayout::at(dest, x_axis.dst, y_axis.dst),
        src: RowLayout::at(src, 0, 0),
    };
    let ia = alpha_weight(alpha);
    let sbits = src.bits();
    let dbits = dest.bits_mut();

    if mode.is_plain_copy() && (ia == 256 || ia == 128) {
        if ia == 256 {
            walk.nearest_packed(dbits, sbits, |_, s| s);
        } else {
            walk.nearest_packed(dbits, sbits, average);
        }
        return;
    }

    let Some(strategy) = Strategy::blend(mode, ia) else {
        return;
    };
    match filter {
        Filter::Bilinear if x_advance >= BOX_FILTER_MIN_STEP && y_advance >= BOX_FILTER_MIN_STEP => {
            let kernel = BoxKernel::for_step(walk.x.step.max(walk.y.step));
            dispatch!(strategy, |c| walk.box_filter(&c, &kernel, dbits, sbits, ia));
        }
        Filter::Bilinear => dispatch!(strategy, |c| walk.bilinear(&c, dbits, sbits, ia)),
        Filter::Nearest => dispatch!(strategy, |c| walk.nearest(&c, dbits, sbits, ia)),
    }
}

// ============================================================================
// Fixed-point walk
// ============================================================================

/// One axis of the walk after clipping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Axis {
    /// First destination pixel
    dst: i32,
    /// Destination pixels to visit
    len: i32,
    /// Source position of `dst`, 16.16
    start: i32,
    /// Source advance per destination pixel, 16.16
    step: i32,
}

impl Axis {
    /// Trim the destination span so every sample of a forward walk lands
    /// inside `0..src_len`. Backward walks are bounds-checked per pixel.
    fn clip(start: i32, step: i32, dst: i32, len: i32, src_len: i32) -> Option<Self> {
        let mut axis = Self { dst, len, start, step };
        if step < 0 {
            // Land inside the mirrored pixel rather than on its right edge
            axis.start -= 1;
        } else if step > 0 {
            let step64 = i64::from(step);
            if axis.start < 0 {
                let skip = (step64 - 1 - i64::from(axis.start)) / step64;
                axis.len = (i64::from(axis.len) - skip).max(0) as i32;
                axis.dst += skip as i32;
                axis.start = (i64::from(axis.start) + step64 * skip) as i32;
            }
            let last = i64::from(axis.start) + step64 * i64::from(axis.len - 1);
            if axis.len > 0 && last >> 16 >= i64::from(src_len) {
                let room = i64::from(src_len) * i64::from(FIXED_ONE) - 1 - i64::from(axis.start);
                let fit = if room < 0 { 0 } else { room / step64 + 1 };
                axis.len = axis.len.min(fit as i32);
            }
        }
        (axis.len >= 1).then_some(axis)
    }
}

struct ScaleWalk {
    x: Axis,
    y: Axis,
    clip_right: i32,
    clip_bottom: i32,
    dst: RowLayout,
    src: RowLayout,
}

impl ScaleWalk {
    /// Visit each destination pixel with its 16.16 source position.
    /// Rows whose source row falls outside `0..rows_below` are skipped.
    #[inline]
    fn for_each(&self, dbits: &mut [Pixel], rows_below: i32, mut f: impl FnMut(&mut Pixel, i32, i32)) {
        let mut cy = self.y.start;
        for row in 0..self.y.len {
            let sy = cy >> 16;
            if sy >= 0 && sy < rows_below {
                let d = self.dst.row(row);
                let mut cx = self.x.start;
                for out in &mut dbits[d..d + self.x.len as usize] {
                    f(out, cx, cy);
                    cx = cx.wrapping_add(self.x.step);
                }
            }
            cy = cy.wrapping_add(self.y.step);
        }
    }

    /// Whole-pixel nearest sampling for plain COPY
    fn nearest_packed(&self, dbits: &mut [Pixel], sbits: &[Pixel], mix: impl Fn(Pixel, Pixel) -> Pixel) {
        self.for_each(dbits, self.clip_bottom, |out, cx, cy| {
            let sx = cx >> 16;
            if sx >= 0 && sx < self.clip_right {
                *out = mix(*out, sbits[self.src.row(cy >> 16) + sx as usize]);
            }
        });
    }

    fn nearest<C: Combine + ?Sized>(&self, c: &C, dbits: &mut [Pixel], sbits: &[Pixel], ia: i32) {
        self.for_each(dbits, self.clip_bottom, |out, cx, cy| {
            let sx = cx >> 16;
            if sx >= 0 && sx < self.clip_right {
                let (r, g, b, a) = channels(sbits[self.src.row(cy >> 16) + sx as usize]);
                c.apply(out, r, g, b, a, ia);
            }
        });
    }

    /// 2x2 interpolation inside, 1-D at the last column and row
    fn bilinear<C: Combine + ?Sized>(&self, c: &C, dbits: &mut [Pixel], sbits: &[Pixel], ia: i32) {
        let (last_col, last_row) = (self.clip_right - 1, self.clip_bottom - 1);
        self.for_each(dbits, self.clip_bottom, |out, cx, cy| {
            let (sx, sy) = (cx >> 16, cy >> 16);
            if sx < 0 || sx > last_col {
                return;
            }
            let (xfrac, yfrac) = (cx & 0xffff, cy & 0xffff);
            let row = self.src.row(sy) + sx as usize;
            let (r, g, b, a) = if sy < last_row {
                let below = self.src.row(sy + 1) + sx as usize;
                if sx < last_col {
                    bilinear(sbits[row], sbits[row + 1], sbits[below], sbits[below + 1], xfrac, yfrac)
                } else {
                    linear(sbits[row], sbits[below], yfrac)
                }
            } else if sx < last_col {
                linear(sbits[row], sbits[row + 1], xfrac)
            } else {
                channels(sbits[row])
            };
            c.apply(out, r, g, b, a, ia);
        });
    }

    /// Weighted box average over in-bounds taps only
    fn box_filter<C: Combine + ?Sized>(&self, c: &C, kernel: &BoxKernel, dbits: &mut [Pixel], sbits: &[Pixel], ia: i32) {
        let start = kernel.start();
        self.for_each(dbits, self.clip_bottom, |out, cx, cy| {
            let (sx, sy) = (cx >> 16, cy >> 16);
            if sx < 0 || sx >= self.clip_right {
                return;
            }
            let mut sum = TapSum::default();
            for ky in 0..kernel.size() {
                let ty = sy + start + ky as i32;
                if ty >= self.clip_bottom {
                    break;
                }
                if ty < 0 {
                    continue;
                }
                let row = self.src.row(ty);
                for (kx, &w) in kernel.row(ky).iter().enumerate() {
                    let tx = sx + start + kx as i32;
                    if tx >= 0 && tx < self.clip_right {
                        sum.add(sbits[row + tx as usize], w);
                    }
                }
            }
            if let Some((r, g, b, a)) = sum.average() {
                c.apply(out, r, g, b, a, ia);
            }
        });
    }
}
