use crate::bitmap::{has_storage, try_accelerate, AccelRequest, Bitmap, RowLayout};
use crate::combine::{dispatch, Combine, Strategy};
use crate::geom::Rect;
use crate::mode::{BlitMode, Operator};
use crate::pixel::{average, channels, Pixel};

use super::alpha_weight;

/// Composite `src_rect` of `src` (whole bitmap when `None`) onto `dest` at
/// `(dst_x, dst_y)`.
///
/// The source rectangle is clamped to `src` first, moving the destination
/// origin along with its left/top edges; the destination rectangle is then
/// clamped to `dest`.
pub fn blit(
    dest: &mut dyn Bitmap,
    src: &dyn Bitmap,
    dst_x: i32,
    dst_y: i32,
    src_rect: Option<Rect>,
    alpha: f32,
    mode: BlitMode,
) {
    if alpha <= 0.0 {
        return;
    }
    let (mut dst_x, mut dst_y) = (dst_x, dst_y);
    let (mut left, mut top, mut right, mut bottom) = match src_rect {
        Some(r) => (r.x, r.y, r.right(), r.bottom()),
        None => (0, 0, src.width(), src.height()),
    };

    // Clamp to source
    if left < 0 {
        dst_x -= left;
        left = 0;
    }
    if top < 0 {
        dst_y -= top;
        top = 0;
    }
    right = right.min(src.width());
    bottom = bottom.min(src.height());

    // Clamp to destination
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

    if right <= left || bottom <= top {
        log::trace!("blit clipped away");
        return;
    }

    let src_rect = Rect::new(left, top, right - left, bottom - top);
    let mut request = AccelRequest::Blit {
        src,
        dst_x,
        dst_y,
        src_rect,
        alpha,
        mode,
    };
    if try_accelerate(dest, &mut request) {
        return;
    }
    if !has_storage(dest) || !has_storage(src) {
        return;
    }

    let span = BlitSpan {
        w: src_rect.w as usize,
        h: src_rect.h,
        dst: RowLayout::at(dest, dst_x, dst_y),
        src: RowLayout::at(src, left, top),
    };
    let ia = alpha_weight(alpha);
    let sbits = src.bits();
    let dbits = dest.bits_mut();

    if mode.operator() == Operator::ChannelCopy && ia == 256 && !mode.uses_source_alpha() {
        let (from, to) = mode.channel_selector();
        let (from, to) = (from.shift(), to.shift());
        span.for_each_row(dbits, sbits, |out, inp| {
            for (o, &p) in out.iter_mut().zip(inp) {
                *o = (*o & !(0xff << to)) | (((p >> from) & 0xff) << to);
            }
        });
        return;
    }

    if mode.operator() == Operator::Copy && !mode.uses_source_alpha() {
        if ia == 256 {
            span.for_each_row(dbits, sbits, |out, inp| out.copy_from_slice(inp));
            return;
        }
        if ia == 128 {
            span.for_each_row(dbits, sbits, |out, inp| {
                for (o, &p) in out.iter_mut().zip(inp) {
                    *o = average(*o, p);
                }
            });
            return;
        }
    }

    let Some(strategy) = Strategy::blend(mode, ia) else {
        return;
    };
    dispatch!(strategy, |c| span.combine(&c, dbits, sbits, ia));
}

/// Copy `src` into `dest`, resizing `dest` to match
pub fn copy(dest: &mut dyn Bitmap, src: &dyn Bitmap) {
    dest.resize(src.width(), src.height());
    blit(dest, src, 0, 0, None, 1.0, BlitMode::COPY);
}

/// A clipped 1:1 region
struct BlitSpan {
    w: usize,
    h: i32,
    dst: RowLayout,
    src: RowLayout,
}

impl BlitSpan {
    #[inline]
    fn for_each_row(&self, dbits: &mut [Pixel], sbits: &[Pixel], mut f: impl FnMut(&mut [Pixel], &[Pixel])) {
        for i in 0..self.h {
            let (d, s) = (self.dst.row(i), self.src.row(i));
            f(&mut dbits[d..d + self.w], &sbits[s..s + self.w]);
        }
    }

    fn combine<C: Combine + ?Sized>(&self, c: &C, dbits: &mut [Pixel], sbits: &[Pixel], ia: i32) {
        self.for_each_row(dbits, sbits, |out, inp| {
            for (o, &p) in out.iter_mut().zip(inp) {
                let (r, g, b, a) = channels(p);
                c.apply(o, r, g, b, a, ia);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::MemBitmap;
    use crate::mode::{BlitFlags, Channel};
    use crate::pixel::rgba;
    use crate::testutil::{Recorded, Recorder, Rng};

    const SENTINEL: Pixel = 0x5a5a5a5a;

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
    fn test_opaque_copy() {
        let mut rng = Rng::new(11);
        let mut src = MemBitmap::new(5, 4);
        rng.fill(&mut src);
        let mut dest = MemBitmap::new(5, 4);
        blit(&mut dest, &src, 0, 0, None, 1.0, BlitMode::COPY);
        for y in 0..4 {
            assert_eq!(dest.row(y), src.row(y));
        }
    }

    #[test]
    fn test_clip_negative_origin_and_overhang() {
        let mut src = MemBitmap::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                src.set_pixel(x, y, (y * 4 + x) as Pixel);
            }
        }
        let mut dest = filled(3, 3, SENTINEL);
        blit(&mut dest, &src, -1, 1, None, 1.0, BlitMode::COPY);
        assert_eq!(dest.row(0), &[SENTINEL; 3]);
        assert_eq!(dest.row(1), &[1, 2, 3]);
        assert_eq!(dest.row(2), &[5, 6, 7]);
    }

    #[test]
    fn test_negative_source_rect_shifts_destination() {
        let src = filled(2, 2, 9);
        let mut dest = filled(4, 4, SENTINEL);
        blit(&mut dest, &src, 0, 0, Some(Rect::new(-1, -1, 3, 3)), 1.0, BlitMode::COPY);
        assert_eq!(dest.pixel(0, 0), Some(SENTINEL));
        assert_eq!(dest.pixel(1, 1), Some(9));
        assert_eq!(dest.pixel(2, 2), Some(9));
        assert_eq!(dest.pixel(3, 3), Some(SENTINEL));
    }

    #[test]
    fn test_empty_and_zero_alpha_are_noops() {
        let src = filled(2, 2, 1);
        let mut dest = filled(2, 2, SENTINEL);
        blit(&mut dest, &src, 2, 0, None, 1.0, BlitMode::COPY);
        blit(&mut dest, &src, 0, 0, None, 0.0, BlitMode::COPY);
        blit(&mut dest, &src, 0, 0, Some(Rect::new(0, 0, 0, 2)), 1.0, BlitMode::COPY);
        blit(&mut dest, &MemBitmap::new(0, 0), 0, 0, None, 1.0, BlitMode::COPY);
        assert!(dest.row(0).iter().chain(dest.row(1)).all(|&p| p == SENTINEL));
    }

    #[test]
    fn test_flipped_source_and_dest() {
        let mut src = MemBitmap::new(1, 3);
        src.set_flipped(true);
        for y in 0..3 {
            src.set_pixel(0, y, y as Pixel + 1);
        }
        let mut dest = MemBitmap::new(1, 3);
        blit(&mut dest, &src, 0, 0, None, 1.0, BlitMode::COPY);
        assert_eq!(dest.bits()[..3], [1, 2, 3]);

        let mut flipped = MemBitmap::new(1, 3);
        flipped.set_flipped(true);
        blit(&mut flipped, &dest, 0, 1, Some(Rect::new(0, 0, 1, 2)), 1.0, BlitMode::COPY);
        assert_eq!(flipped.pixel(0, 1), Some(1));
        assert_eq!(flipped.pixel(0, 2), Some(2));
        assert_eq!(flipped.bits()[..3], [2, 1, 0]);
    }

    #[test]
    fn test_half_fast_path_matches_generic() {
        let mut rng = Rng::new(12);
        let mut src = MemBitmap::new(8, 8);
        let mut base = MemBitmap::new(8, 8);
        rng.fill(&mut src);
        rng.fill(&mut base);

        let mut fast = base.clone();
        blit(&mut fast, &src, 0, 0, None, 0.5, BlitMode::COPY);
        let mut generic = base.clone();
        let strategy = Strategy::constant(BlitMode::COPY, 128, true).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                let mut p = generic.pixel(x, y).unwrap();
                let (r, g, b, a) = channels(src.pixel(x, y).unwrap());
                strategy.with_dyn(|c| c.apply(&mut p, r, g, b, a, 128));
                generic.set_pixel(x, y, p);
            }
        }
        for y in 0..8 {
            assert_eq!(fast.row(y), generic.row(y));
        }
    }

    #[test]
    fn test_channel_copy() {
        let src = filled(2, 1, rgba(10, 20, 30, 40));
        let mut dest = filled(2, 1, rgba(1, 2, 3, 4));
        blit(&mut dest, &src, 0, 0, None, 1.0, BlitMode::channel_copy(Channel::Alpha, Channel::Red));
        assert_eq!(dest.row(0), &[rgba(40, 2, 3, 4); 2]);
    }

    #[test]
    fn test_source_alpha_blend() {
        let src = filled(1, 1, rgba(255, 255, 255, 0));
        let mut dest = filled(1, 1, rgba(9, 9, 9, 9));
        blit(&mut dest, &src, 0, 0, None, 1.0, BlitMode::COPY.with(BlitFlags::USE_SOURCE_ALPHA));
        assert_eq!(dest.pixel(0, 0), Some(rgba(9, 9, 9, 9)));
    }

    #[test]
    fn test_copy_resizes() {
        let src = filled(3, 2, 4);
        let mut dest = MemBitmap::new(1, 1);
        copy(&mut dest, &src);
        assert_eq!((dest.width(), dest.height()), (3, 2));
        assert_eq!(dest.row(1), &[4, 4, 4]);
    }

    #[test]
    fn test_blit_hook_gets_clipped_request() {
        let mut rng = Rng::new(21);
        let mut src = MemBitmap::new(4, 4);
        rng.fill(&mut src);

        let mut taken = Recorder::new(6, 6, true);
        blit(&mut taken, &src, -1, 4, None, 0.5, BlitMode::ADD);
        assert_eq!(
            taken.seen,
            [Recorded::Blit {
                dst_x: 0,
                dst_y: 4,
                src_rect: Rect::new(1, 0, 3, 2),
            }]
        );
        assert!(taken.inner.bits().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_declined_blit_hook_runs_software() {
        let mut rng = Rng::new(22);
        let mut src = MemBitmap::new(4, 4);
        rng.fill(&mut src);

        let mut declined = Recorder::new(6, 6, false);
        blit(&mut declined, &src, -1, 4, None, 1.0, BlitMode::COPY);
        assert_eq!(declined.seen.len(), 1);
        assert_eq!(declined.inner.row(4)[..3], src.row(0)[1..]);
        assert_eq!(declined.inner.row(5)[..3], src.row(1)[1..]);
        assert_eq!(declined.inner.pixel(3, 4), Some(0));
        assert_eq!(declined.inner.row(3), &[0; 6]);
    }

    #[test]
    fn test_blit_hook_skipped_when_clipped_away() {
        let src = MemBitmap::new(2, 2);
        let mut dest = Recorder::new(4, 4, true);
        blit(&mut dest, &src, 10, 0, None, 1.0, BlitMode::COPY);
        assert!(dest.seen.is_empty());
    }
}
