//! Affine rasterizer: delta, rotated and grid-warp blits
//!
//! Every destination pixel maps to a source position `(s, t)`. Moving one
//! pixel right adds `(dsdx, dtdx)`; moving one row down adds `(dsdy, dtdy)`
//! to the row start and `(dsdxdy, dtdxdy)` to the per-pixel step itself, which
//! lets a single call approximate a perspective-like warp.
//!
//! Positions are taken at destination pixel centres. Nearest sampling picks
//! the source pixel containing the position; bilinear interpolates between
//! the four nearest source pixel centres.

use crate::bitmap::{has_storage, Bitmap, RowLayout};
use crate::combine::{dispatch, Combine, Strategy};
use crate::geom::{Rect, RectF};
use crate::mode::{BlitMode, Filter};
use crate::pixel::{channels, Pixel};

use super::sample::{bilinear, linear};
use super::{alpha_weight, to_fixed};

/// Source steps for [`delta_blit`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeltaSteps {
    pub dsdx: f64,
    pub dtdx: f64,
    pub dsdy: f64,
    pub dtdy: f64,
    /// Change of `dsdx` per destination row
    pub dsdxdy: f64,
    /// Change of `dtdx` per destination row
    pub dtdxdy: f64,
}

impl DeltaSteps {
    /// Plain affine steps, no per-row change
    pub const fn affine(dsdx: f64, dtdx: f64, dsdy: f64, dtdy: f64) -> Self {
        Self {
            dsdx,
            dtdx,
            dsdy,
            dtdy,
            dsdxdy: 0.0,
            dtdxdy: 0.0,
        }
    }
}

/// Source bounds samples must fall in, before truncation to pixels
#[derive(Debug, Clone, Copy)]
struct SourceClip {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl SourceClip {
    fn new(src: &dyn Bitmap, src_rect: RectF, clip_to_source: bool) -> Self {
        let mut clip = Self {
            left: 0.0,
            top: 0.0,
            right: f64::from(src.width()),
            bottom: f64::from(src.height()),
        };
        if clip_to_source {
            let (x, y) = (f64::from(src_rect.x), f64::from(src_rect.y));
            clip.left = clip.left.max(x);
            clip.top = clip.top.max(y);
            clip.right = clip.right.min(x + f64::from(src_rect.w));
            clip.bottom = clip.bottom.min(y + f64::from(src_rect.h));
        }
        clip
    }
}

/// Negative destination extents move the destination origin to the near
/// edge and the source origin to the far one.
fn normalize(dst: Rect, src_rect: RectF) -> (Rect, RectF) {
    let (mut dst, mut src_rect) = (dst, src_rect);
    if dst.w < 0 {
        dst.w = -dst.w;
        dst.x -= dst.w;
        src_rect.x += src_rect.w;
        src_rect.w = -src_rect.w;
    }
    if dst.h < 0 {
        dst.h = -dst.h;
        dst.y -= dst.h;
        src_rect.y += src_rect.h;
        src_rect.h = -src_rect.h;
    }
    (dst, src_rect)
}

/// Forward-mapped blit with per-pixel and per-row source steps.
///
/// `src_rect.x`/`src_rect.y` is the source position of the destination
/// rectangle's top-left corner. With `clip_to_source`, samples outside
/// `src_rect` are skipped as well as those outside `src`.
pub fn delta_blit(
    dest: &mut dyn Bitmap,
    src: &dyn Bitmap,
    dst: Rect,
    src_rect: RectF,
    steps: DeltaSteps,
    clip_to_source: bool,
    alpha: f32,
    mode: BlitMode,
) {
    if dst.w == 0 || dst.h == 0 {
        return;
    }
    let clip = SourceClip::new(src, src_rect, clip_to_source);
    let (dst, src_rect) = normalize(dst, src_rect);
    let origin = (f64::from(src_rect.x), f64::from(src_rect.y));
    raster(dest, src, dst, origin, steps, clip, alpha, mode);
}

/// Rotate `src_rect` by `angle` radians into `dst`.
///
/// `src_rect` is scaled to fill `dst`; `center` offsets the rotation pivot
/// from the middle of `src_rect`, in source pixels.
pub fn rotated_blit(
    dest: &mut dyn Bitmap,
    src: &dyn Bitmap,
    dst: Rect,
    src_rect: RectF,
    angle: f32,
    clip_to_source: bool,
    alpha: f32,
    mode: BlitMode,
    center: (f32, f32),
) {
    if dst.w == 0 || dst.h == 0 {
        return;
    }
    let clip = SourceClip::new(src, src_rect, clip_to_source);
    let (dst, src_rect) = normalize(dst, src_rect);

    let (sin, cos) = f64::from(angle).sin_cos();
    let (src_w, src_h) = (f64::from(src_rect.w), f64::from(src_rect.h));
    let (dst_w, dst_h) = (f64::from(dst.w), f64::from(dst.h));
    let (xsc, ysc) = (src_w / dst_w, src_h / dst_h);
    let steps = DeltaSteps::affine(xsc * cos, ysc * -sin, xsc * sin, ysc * cos);

    // Keep the pivot fixed: the destination centre maps onto it
    let s = f64::from(src_rect.x) - (0.5 * (dst_w * steps.dsdx + dst_h * steps.dsdy - src_w) - f64::from(center.0));
    let t = f64::from(src_rect.y) - (0.5 * (dst_h * steps.dtdy + dst_w * steps.dtdx - src_h) - f64::from(center.1));
    raster(dest, src, dst, (s, t), steps, clip, alpha, mode);
}

/// Warp `src` through a grid of source points onto `dst`.
///
/// `points` holds `div_w * div_h` `(s, t)` pairs, row-major; they are the
/// source positions of evenly spaced grid lines across `dst`. Each cell is
/// drawn with one [`delta_blit`]; cells that round to zero width or height
/// are skipped.
pub fn transform_blit(
    dest: &mut dyn Bitmap,
    src: &dyn Bitmap,
    dst: Rect,
    points: &[f32],
    div_w: usize,
    div_h: usize,
    alpha: f32,
    mode: BlitMode,
) {
    if dst.is_empty() || div_w < 2 || div_h < 2 || points.len() < div_w * div_h * 2 {
        return;
    }
    let point = |col: usize, row: usize| {
        let i = (row * div_w + col) * 2;
        (f64::from(points[i]), f64::from(points[i + 1]))
    };
    let dx = f64::from(dst.w) / (div_w - 1) as f64;
    let dy = f64::from(dst.h) / (div_h - 1) as f64;

    let mut y = f64::from(dst.y);
    let mut cell_top = dst.y;
    for row in 0..div_h - 1 {
        y += dy;
        let cell_bottom = y as i32;
        if cell_bottom != cell_top {
            let iy = 1.0 / f64::from(cell_bottom - cell_top);
            let mut x = f64::from(dst.x);
            let mut cell_left = dst.x;
            for col in 0..div_w - 1 {
                x += dx;
                let cell_right = x as i32;
                if cell_right != cell_left {
                    let ix = 1.0 / f64::from(cell_right - cell_left);
                    let (s0, t0) = point(col, row);
                    let (s1, t1) = point(col + 1, row);
                    let (s2, t2) = point(col, row + 1);
                    let (s3, t3) = point(col + 1, row + 1);

                    let (dsdx, dtdx) = ((s1 - s0) * ix, (t1 - t0) * ix);
                    let (dsdx_below, dtdx_below) = ((s3 - s2) * ix, (t3 - t2) * ix);
                    let steps = DeltaSteps {
                        dsdx,
                        dtdx,
                        dsdy: (s2 - s0) * iy,
                        dtdy: (t2 - t0) * iy,
                        dsdxdy: (dsdx_below - dsdx) * iy,
                        dtdxdy: (dtdx_below - dtdx) * iy,
                    };
                    let cell = Rect::new(cell_left, cell_top, cell_right - cell_left, cell_bottom - cell_top);
                    let src_rect = RectF::new(s0 as f32, t0 as f32, (s1 - s0) as f32, (t1 - t0) as f32);
                    delta_blit(dest, src, cell, src_rect, steps, false, alpha, mode);
                }
                cell_left = cell_right;
            }
        }
        cell_top = cell_bottom;
    }
}

/// Clip against the destination, convert to fixed point and run the walk
fn raster(
    dest: &mut dyn Bitmap,
    src: &dyn Bitmap,
    dst: Rect,
    origin: (f64, f64),
    steps: DeltaSteps,
    clip: SourceClip,
    alpha: f32,
    mode: BlitMode,
) {
    let Rect {
        x: mut dst_x,
        y: mut dst_y,
        w: mut dst_w,
        h: mut dst_h,
    } = dst;
    let (mut s, mut t) = origin;
    let mut steps = steps;

    if dst_x < 0 {
        let skip = -f64::from(dst_x);
        s += skip * steps.dsdx;
        t += skip * steps.dtdx;
        // Later rows step further per skipped column
        steps.dsdy += skip * steps.dsdxdy;
        steps.dtdy += skip * steps.dtdxdy;
        dst_w += dst_x;
        dst_x = 0;
    }
    if dst_y < 0 {
        let skip = -f64::from(dst_y);
        s += skip * steps.dsdy;
        t += skip * steps.dtdy;
        steps.dsdx += skip * steps.dsdxdy;
        steps.dtdx += skip * steps.dtdxdy;
        dst_h += dst_y;
        dst_y = 0;
    }
    dst_w = dst_w.min(dest.width() - dst_x);
    dst_h = dst_h.min(dest.height() - dst_y);
    if dst_w < 1 || dst_h < 1 || !has_storage(dest) || !has_storage(src) {
        return;
    }

    let ia = alpha_weight(alpha);
    let Some(strategy) = Strategy::blend(mode, ia) else {
        return;
    };
    let filter = mode.filter();

    // Pixel centres; bilinear measures from source pixel centres
    s += 0.5 * (steps.dsdx + steps.dsdy);
    t += 0.5 * (steps.dtdx + steps.dtdy);
    if filter == Filter::Bilinear {
        s -= 0.5;
        t -= 0.5;
    }

    let walk = DeltaWalk {
        w: dst_w as usize,
        h: dst_h,
        s: to_fixed(s),
        t: to_fixed(t),
        dsdx: to_fixed(steps.dsdx),
        dtdx: to_fixed(steps.dtdx),
        dsdy: to_fixed(steps.dsdy + 0.5 * steps.dsdxdy),
        dtdy: to_fixed(steps.dtdy + 0.5 * steps.dtdxdy),
        dsdxdy: to_fixed(steps.dsdxdy),
        dtdxdy: to_fixed(steps.dtdxdy),
        left: clip.left as i32,
        top: clip.top as i32,
        right: clip.right as i32,
        bottom: clip.bottom as i32,
        dst: RowLayout::at(dest, dst_x, dst_y),
        src: RowLayout::at(src, 0, 0),
    };
    let sbits = src.bits();
    let dbits = dest.bits_mut();
    match filter {
        Filter::Bilinear => dispatch!(strategy, |c| walk.bilinear(&c, dbits, sbits, ia)),
        Filter::Nearest => dispatch!(strategy, |c| walk.nearest(&c, dbits, sbits, ia)),
    }
}

/// Fixed-point state of one delta blit
struct DeltaWalk {
    w: usize,
    h: i32,
    s: i32,
    t: i32,
    dsdx: i32,
    dtdx: i32,
    dsdy: i32,
    dtdy: i32,
    dsdxdy: i32,
    dtdxdy: i32,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    dst: RowLayout,
    src: RowLayout,
}

impl DeltaWalk {
    #[inline]
    fn for_each(&self, dbits: &mut [Pixel], mut f: impl FnMut(&mut Pixel, i32, i32)) {
        let (mut row_s, mut row_t) = (self.s, self.t);
        let (mut dsdx, mut dtdx) = (self.dsdx, self.dtdx);
        for row in 0..self.h {
            let d = self.dst.row(row);
            let (mut s, mut t) = (row_s, row_t);
            for out in &mut dbits[d..d + self.w] {
                f(out, s, t);
                s = s.wrapping_add(dsdx);
                t = t.wrapping_add(dtdx);
            }
            dsdx = dsdx.wrapping_add(self.dsdxdy);
            dtdx = dtdx.wrapping_add(self.dtdxdy);
            row_s = row_s.wrapping_add(self.dsdy);
            row_t = row_t.wrapping_add(self.dtdy);
        }
    }

    fn nearest<C: Combine + ?Sized>(&self, c: &C, dbits: &mut [Pixel], sbits: &[Pixel], ia: i32) {
        self.for_each(dbits, |out, s, t| {
            let (x, y) = (s >> 16, t >> 16);
            if x >= self.left && x < self.right && y >= self.top && y < self.bottom {
                let (r, g, b, a) = channels(sbits[self.src.row(y) + x as usize]);
                c.apply(out, r, g, b, a, ia);
            }
        });
    }

    /// Same edge rule as the scaled blit: 1-D at the last column and row
    fn bilinear<C: Combine + ?Sized>(&self, c: &C, dbits: &mut [Pixel], sbits: &[Pixel], ia: i32) {
        let (last_col, last_row) = (self.right - 1, self.bottom - 1);
        self.for_each(dbits, |out, s, t| {
            let (x, y) = (s >> 16, t >> 16);
            if x < self.left || x > last_col || y < self.top || y > last_row {
                return;
            }
            let (xfrac, yfrac) = (s & 0xffff, t & 0xffff);
            let row = self.src.row(y) + x as usize;
            let (r, g, b, a) = if y < last_row {
                let below = self.src.row(y + 1) + x as usize;
                if x < last_col {
                    bilinear(sbits[row], sbits[row + 1], sbits[below], sbits[below + 1], xfrac, yfrac)
                } else {
                    linear(sbits[row], sbits[below], yfrac)
                }
            } else if x < last_col {
                linear(sbits[row], sbits[row + 1], xfrac)
            } else {
                channels(sbits[row])
            };
            c.apply(out, r, g, b, a, ia);
        });
    }
}
