//! Bitmap capability interface
//!
//! Every rasterizer reads and writes through [`Bitmap`]. Storage is exposed
//! as a slice of at least `row_span * (height - 1) + width` pixels; a flipped
//! bitmap keeps logical row 0 in its last storage row.

mod mem;

pub use mem::MemBitmap;

use crate::geom::{Rect, RectF};
use crate::mode::BlitMode;
use crate::pixel::Pixel;

// ============================================================================
// Acceleration hooks
// ============================================================================

/// Operations a bitmap implementation may take over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Blit,
    ScaledBlit,
    FillRect,
    Clear,
    GetPixel,
    PutPixel,
    DrawGlyph,
}

/// Parameters handed to [`Bitmap::invoke`]
pub enum AccelRequest<'a> {
    /// Already clipped straight blit
    Blit {
        src: &'a dyn Bitmap,
        dst_x: i32,
        dst_y: i32,
        src_rect: Rect,
        alpha: f32,
        mode: BlitMode,
    },
    ScaledBlit {
        src: &'a dyn Bitmap,
        dst: Rect,
        src_rect: RectF,
        alpha: f32,
        mode: BlitMode,
    },
    FillRect {
        rect: Rect,
        color: Pixel,
        alpha: f32,
        mode: BlitMode,
    },
    Clear {
        color: Pixel,
    },
    /// `pixel` is written by the handler
    GetPixel {
        x: i32,
        y: i32,
        pixel: Pixel,
    },
    PutPixel {
        x: i32,
        y: i32,
        color: Pixel,
        alpha: f32,
        mode: BlitMode,
    },
    /// 8-bit coverage glyph, for external text renderers
    DrawGlyph {
        x: i32,
        y: i32,
        color: Pixel,
        coverage: &'a [u8],
        width: i32,
        height: i32,
        alpha: f32,
        mode: BlitMode,
    },
}

impl AccelRequest<'_> {
    pub const fn capability(&self) -> Capability {
        match self {
            Self::Blit { .. } => Capability::Blit,
            Self::ScaledBlit { .. } => Capability::ScaledBlit,
            Self::FillRect { .. } => Capability::FillRect,
            Self::Clear { .. } => Capability::Clear,
            Self::GetPixel { .. } => Capability::GetPixel,
            Self::PutPixel { .. } => Capability::PutPixel,
            Self::DrawGlyph { .. } => Capability::DrawGlyph,
        }
    }
}

// ============================================================================
// Bitmap
// ============================================================================

pub trait Bitmap {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    /// Pixels per storage row, `>= width`
    fn row_span(&self) -> i32;

    /// Row 0 stored last (bottom-up)
    fn is_flipped(&self) -> bool {
        false
    }

    fn bits(&self) -> &[Pixel];
    fn bits_mut(&mut self) -> &mut [Pixel];

    /// Returns whether the geometry changed
    fn resize(&mut self, width: i32, height: i32) -> bool;

    fn supports(&self, _cap: Capability) -> bool {
        false
    }

    /// Returns `true` if handled; `false` falls back to software
    fn invoke(&mut self, _request: &mut AccelRequest<'_>) -> bool {
        false
    }
}

/// Whether `bm` has a non-empty geometry backed by enough storage
pub(crate) fn has_storage(bm: &dyn Bitmap) -> bool {
    let (w, h, span) = (bm.width(), bm.height(), bm.row_span());
    w > 0 && h > 0 && span >= w && bm.bits().len() >= span as usize * (h as usize - 1) + w as usize
}

/// Flip-aware row addressing
///
/// `origin` is the storage index of the logical pixel the layout was built
/// for; `stride` is negative for flipped bitmaps so callers walk rows
/// top-down either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowLayout {
    origin: isize,
    stride: isize,
}

impl RowLayout {
    /// Layout anchored at logical `(x, y)`
    pub(crate) fn at(bm: &dyn Bitmap, x: i32, y: i32) -> Self {
        let span = bm.row_span() as isize;
        let (row, stride) = if bm.is_flipped() {
            ((bm.height() - 1 - y) as isize, -span)
        } else {
            (y as isize, span)
        };
        Self {
            origin: row * span + x as isize,
            stride,
        }
    }

    /// Storage index of the start of the `i`-th row from the anchor
    #[inline]
    pub(crate) fn row(self, i: i32) -> usize {
        (self.origin + i as isize * self.stride) as usize
    }
}

/// Probe `supports`, then `invoke`
pub(crate) fn try_accelerate(dest: &mut dyn Bitmap, request: &mut AccelRequest<'_>) -> bool {
    let cap = request.capability();
    if !dest.supports(cap) {
        return false;
    }
    let handled = dest.invoke(request);
    log::trace!("acceleration hook {:?}: {}", cap, if handled { "handled" } else { "declined" });
    handled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_layout_top_down() {
        let bm = MemBitmap::with_line_align(3, 4, 4);
        assert_eq!(bm.row_span(), 4);
        let rows = RowLayout::at(&bm, 1, 2);
        assert_eq!(rows.row(0), 9);
        assert_eq!(rows.row(1), 13);
    }

    #[test]
    fn test_row_layout_flipped() {
        let mut bm = MemBitmap::new(3, 4);
        bm.set_flipped(true);
        let rows = RowLayout::at(&bm, 0, 0);
        assert_eq!(rows.row(0), 9);
        assert_eq!(rows.row(3), 0);
    }

    #[test]
    fn test_has_storage() {
        assert!(has_storage(&MemBitmap::new(2, 2)));
        assert!(!has_storage(&MemBitmap::new(0, 2)));
    }

    struct Declines(MemBitmap, std::cell::Cell<u32>);

    impl Bitmap for Declines {
        fn width(&self) -> i32 {
            self.0.width()
        }
        fn height(&self) -> i32 {
            self.0.height()
        }
        fn row_span(&self) -> i32 {
            self.0.row_span()
        }
        fn bits(&self) -> &[Pixel] {
            self.0.bits()
        }
        fn bits_mut(&mut self) -> &mut [Pixel] {
            self.0.bits_mut()
        }
        fn resize(&mut self, width: i32, height: i32) -> bool {
            self.0.resize(width, height)
        }
        fn supports(&self, cap: Capability) -> bool {
            self.1.set(self.1.get() + 1);
            cap == Capability::Clear
        }
        fn invoke(&mut self, _request: &mut AccelRequest<'_>) -> bool {
            false
        }
    }

    #[test]
    fn test_try_accelerate_probes_first() {
        let mut bm = Declines(MemBitmap::new(1, 1), std::cell::Cell::new(0));
        assert!(!try_accelerate(&mut bm, &mut AccelRequest::Clear { color: 0 }));
        assert!(!try_accelerate(&mut bm, &mut AccelRequest::GetPixel { x: 0, y: 0, pixel: 0 }));
        assert_eq!(bm.1.get(), 2);
    }
}
