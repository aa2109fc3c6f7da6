//! Fixed-weight box blur and 2:1 downsampling
//!
//! Weights are powers of two so each tap is a masked shift of the packed
//! pixel. Per channel, self weighs 1/2 and the 4-connected neighbours share
//! the other half: 1/8 each inside, 1/4 for the single neighbour along an
//! axis at the bitmap edge.

use crate::bitmap::{has_storage, Bitmap, RowLayout};
use crate::geom::Rect;
use crate::pixel::{eighth, half, quarter, Pixel};

/// Vertical neighbours of a row
#[derive(Clone, Copy)]
enum Vertical<'a> {
    /// Top or bottom row: the one row beside it
    Edge(&'a [Pixel]),
    Interior(&'a [Pixel], &'a [Pixel]),
}

impl Vertical<'_> {
    #[inline]
    fn tap(self, x: usize) -> Pixel {
        match self {
            Self::Edge(row) => quarter(row[x]),
            Self::Interior(up, down) => eighth(up[x]) + eighth(down[x]),
        }
    }
}

/// Blur one row of at least two pixels into `out`
fn blur_row(out: &mut [Pixel], cur: &[Pixel], vertical: Vertical<'_>) {
    let last = cur.len() - 1;
    for (x, o) in out.iter_mut().enumerate() {
        let horizontal = if x == 0 {
            quarter(cur[1])
        } else if x == last {
            quarter(cur[last - 1])
        } else {
            eighth(cur[x - 1]) + eighth(cur[x + 1])
        };
        *o = half(cur[x]) + horizontal + vertical.tap(x);
    }
}

/// Blur `src_rect` of `src` (whole bitmap when `None`) into `dest` at
/// `(dst_x, dst_y)`.
///
/// The source rectangle is clamped to `src` without moving the destination.
/// Regions smaller than 2x2 after clipping are ignored.
pub fn blur(dest: &mut dyn Bitmap, src: &dyn Bitmap, dst_x: i32, dst_y: i32, src_rect: Option<Rect>) {
    let src_rect = src_rect.unwrap_or(Rect::new(0, 0, src.width(), src.height()));
    let (mut dst_x, mut dst_y) = (dst_x, dst_y);
    let mut left = src_rect.x.max(0);
    let mut top = src_rect.y.max(0);
    let mut right = src_rect.right().min(src.width());
    let mut bottom = src_rect.bottom().min(src.height());

    if dst_x < 0 {
        left -= dst_x;
        dst_x = 0;
    }
    if dst_y < 0 {
        top -= dst_y;
        dst_y = 0;
    }
    right = right.min(left + dest.width() - dst_x);
    bottom = bottom.min(top + dest.height() - dst_y);

    if right - left < 2 || bottom - top < 2 {
        log::trace!("blur region below 2x2");
        return;
    }
    if !has_storage(dest) || !has_storage(src) {
        return;
    }

    let (w, h) = ((right - left) as usize, bottom - top);
    let srows = RowLayout::at(src, left, top);
    let drows = RowLayout::at(dest, dst_x, dst_y);
    let sbits = src.bits();
    let dbits = dest.bits_mut();
    let row = |i: i32| row_slice(sbits, srows, i, w);

    for i in 0..h {
        let vertical = if i == 0 {
            Vertical::Edge(row(1))
        } else if i == h - 1 {
            Vertical::Edge(row(i - 1))
        } else {
            Vertical::Interior(row(i - 1), row(i + 1))
        };
        let d = drows.row(i);
        blur_row(&mut dbits[d..d + w], row(i), vertical);
    }
}

/// Blur `rect` of `bm` in place.
///
/// Every output pixel is computed from the original values; the rows above
/// and at the current position are kept in a two-row scratch buffer before
/// they are overwritten.
pub fn blur_in_place(bm: &mut dyn Bitmap, rect: Rect) {
    let rect = rect.clip_to(bm.width(), bm.height());
    if rect.w < 2 || rect.h < 2 || !has_storage(bm) {
        log::trace!("blur region below 2x2");
        return;
    }

    let w = rect.w as usize;
    let rows = RowLayout::at(bm, rect.x, rect.y);
    let bits = bm.bits_mut();
    let mut prev = vec![0; w];
    let mut cur = vec![0; w];

    for i in 0..rect.h {
        let at = rows.row(i);
        cur.copy_from_slice(&bits[at..at + w]);
        if i == rect.h - 1 {
            blur_row(&mut bits[at..at + w], &cur, Vertical::Edge(&prev));
        } else {
            let (out, next) = split_rows(bits, at, rows.row(i + 1), w);
            let vertical = if i == 0 {
                Vertical::Edge(next)
            } else {
                Vertical::Interior(&prev, next)
            };
            blur_row(out, &cur, vertical);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
}

#[inline]
fn row_slice(bits: &[Pixel], rows: RowLayout, i: i32, w: usize) -> &[Pixel] {
    let start = rows.row(i);
    &bits[start..start + w]
}

/// Borrow row `out` mutably and row `other` shared; rows must not overlap
fn split_rows(bits: &mut [Pixel], out: usize, other: usize, w: usize) -> (&mut [Pixel], &[Pixel]) {
    if out < other {
        let (lo, hi) = bits.split_at_mut(other);
        (&mut lo[out..out + w], &hi[..w])
    } else {
        let (lo, hi) = bits.split_at_mut(out);
        (&mut hi[..w], &lo[other..other + w])
    }
}

/// Downsample `src` 2:1 on both axes into `dest`, averaging each 2x2 block.
///
/// Covers as much of `dest` as `src` has whole blocks for. Each tap is
/// quartered before summing, so the low two bits of every channel are lost.
pub fn halve_blit_aa(dest: &mut dyn Bitmap, src: &dyn Bitmap) {
    let w = dest.width().min(src.width() / 2);
    let h = dest.height().min(src.height() / 2);
    if w <= 0 || h <= 0 || !has_storage(dest) || !has_storage(src) {
        return;
    }

    let srows = RowLayout::at(src, 0, 0);
    let drows = RowLayout::at(dest, 0, 0);
    let sbits = src.bits();
    let dbits = dest.bits_mut();
    let (w, sw) = (w as usize, 2 * w as usize);

    for i in 0..h {
        let top = row_slice(sbits, srows, 2 * i, sw);
        let bottom = row_slice(sbits, srows, 2 * i + 1, sw);
        let d = drows.row(i);
        let blocks = top.chunks_exact(2).zip(bottom.chunks_exact(2));
        for (o, (t, b)) in dbits[d..d + w].iter_mut().zip(blocks) {
            *o = quarter(t[0]) + quarter(t[1]) + quarter(b[0]) + quarter(b[1]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::MemBitmap;
    use crate::pixel::{channels, rgba};
    use crate::testutil::Rng;

    fn filled(w: i32, h: i32, p: Pixel) -> MemBitmap {
        let mut bm = MemBitmap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                bm.set_pixel(x, y, p);
            }
        }
        bm
    }

    #[test]
    fn test_single_white_pixel() {
        let white = rgba(255, 255, 255, 255);
        let mut src = MemBitmap::new(5, 5);
        src.set_pixel(2, 2, white);
        let mut dest = MemBitmap::new(5, 5);
        blur(&mut dest, &src, 0, 0, None);

        let level = |x, y| channels(dest.pixel(x, y).unwrap()).0;
        assert_eq!(level(2, 2), 127);
        for (x, y) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
            assert_eq!(level(x, y), 31);
        }
        for (x, y) in [(1, 1), (3, 3), (0, 0), (4, 2), (2, 0)] {
            assert_eq!(level(x, y), 0);
        }
    }

    #[test]
    fn test_uniform_is_preserved() {
        let v = rgba(200, 96, 40, 8);
        let src = filled(4, 3, v);
        let mut dest = MemBitmap::new(4, 3);
        blur(&mut dest, &src, 0, 0, None);
        for y in 0..3 {
            assert_eq!(dest.row(y), &[v; 4]);
        }
    }

    #[test]
    fn test_edge_weights() {
        let mut src = MemBitmap::new(3, 2);
        src.set_pixel(0, 0, rgba(255, 0, 0, 0));
        let mut dest = MemBitmap::new(3, 2);
        blur(&mut dest, &src, 0, 0, None);
        let level = |x, y| channels(dest.pixel(x, y).unwrap()).0;
        assert_eq!(level(0, 0), 127);
        assert_eq!(level(1, 0), 31);
        assert_eq!(level(0, 1), 63);
        assert_eq!(level(1, 1), 0);
    }

    #[test]
    fn test_in_place_matches_separate() {
        let mut src = MemBitmap::new(7, 6);
        Rng::new(21).fill(&mut src);

        let mut separate = src.clone();
        blur(&mut separate, &src, 1, 1, Some(Rect::new(1, 1, 5, 4)));
        let mut in_place = src.clone();
        blur_in_place(&mut in_place, Rect::new(1, 1, 5, 4));
        for y in 0..6 {
            assert_eq!(in_place.row(y), separate.row(y), "row {y}");
        }
    }

    #[test]
    fn test_in_place_flipped() {
        let mut src = MemBitmap::new(4, 4);
        src.set_flipped(true);
        Rng::new(22).fill(&mut src);
        let mut separate = MemBitmap::new(4, 4);
        blur(&mut separate, &src, 0, 0, None);
        blur_in_place(&mut src, Rect::new(0, 0, 4, 4));
        for y in 0..4 {
            assert_eq!(src.row(y), separate.row(y));
        }
    }

    #[test]
    fn test_too_small_is_noop() {
        let src = filled(1, 4, 0xffffffff);
        let mut dest = filled(1, 4, 3);
        blur(&mut dest, &src, 0, 0, None);
        assert_eq!(dest.row(0), &[3]);

        let mut thin = filled(5, 5, 3);
        blur_in_place(&mut thin, Rect::new(4, 0, 3, 5));
        assert_eq!(thin.pixel(4, 2), Some(3));
    }

    #[test]
    fn test_clipped_destination() {
        let src = filled(4, 4, rgba(80, 80, 80, 80));
        let mut dest = filled(3, 3, 0);
        blur(&mut dest, &src, -1, 1, None);
        assert_eq!(dest.row(0), &[0, 0, 0]);
        assert_eq!(dest.row(1), &[rgba(80, 80, 80, 80); 3]);
    }

    #[test]
    fn test_halve_blit_aa() {
        let mut src = MemBitmap::new(5, 2);
        for (x, v) in [40u8, 80, 120, 160, 255].into_iter().enumerate() {
            src.set_pixel(x as i32, 0, rgba(v, 0, 0, 0));
            src.set_pixel(x as i32, 1, rgba(v, 0, 0, 0));
        }
        let mut dest = filled(3, 3, 7);
        halve_blit_aa(&mut dest, &src);
        assert_eq!(dest.row(0), &[rgba(60, 0, 0, 0), rgba(140, 0, 0, 0), 7]);
        assert_eq!(dest.row(1), &[7, 7, 7]);
    }
}
