//! Test helpers

use crate::bitmap::{AccelRequest, Bitmap, Capability, MemBitmap};
use crate::geom::{Rect, RectF};
use crate::pixel::Pixel;

/// Deterministic xorshift64 RNG for reproducible pixel data
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) } // Ensure non-zero
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Any packed pixel, alpha included
    #[inline]
    pub fn next_pixel(&mut self) -> Pixel {
        self.next_u32()
    }

    /// Get a random i32 in [min, max]
    #[inline]
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max, "range_i32: min ({}) must be <= max ({})", min, max);
        let range = (max - min + 1) as u64;
        min + (self.next_u64() % range) as i32
    }

    /// Fill a bitmap with noise
    pub fn fill(&mut self, bm: &mut MemBitmap) {
        for y in 0..bm.height() {
            for x in 0..bm.width() {
                let p = self.next_pixel();
                bm.set_pixel(x, y, p);
            }
        }
    }
}

/// What a [`Recorder`] saw, with the source dropped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recorded {
    Blit { dst_x: i32, dst_y: i32, src_rect: Rect },
    ScaledBlit { dst: Rect, src_rect: RectF },
    Other(Capability),
}

/// Bitmap that advertises blit hooks and logs every request it gets.
/// With `take` unset it declines, leaving the work to software.
pub struct Recorder {
    pub inner: MemBitmap,
    pub take: bool,
    pub seen: Vec<Recorded>,
}

impl Recorder {
    pub fn new(width: i32, height: i32, take: bool) -> Self {
        Self {
            inner: MemBitmap::new(width, height),
            take,
            seen: Vec::new(),
        }
    }
}

impl Bitmap for Recorder {
    fn width(&self) -> i32 {
        self.inner.width()
    }
    fn height(&self) -> i32 {
        self.inner.height()
    }
    fn row_span(&self) -> i32 {
        self.inner.row_span()
    }
    fn bits(&self) -> &[Pixel] {
        self.inner.bits()
    }
    fn bits_mut(&mut self) -> &mut [Pixel] {
        self.inner.bits_mut()
    }
    fn resize(&mut self, width: i32, height: i32) -> bool {
        self.inner.resize(width, height)
    }
    fn supports(&self, cap: Capability) -> bool {
        matches!(cap, Capability::Blit | Capability::ScaledBlit)
    }
    fn invoke(&mut self, request: &mut AccelRequest<'_>) -> bool {
        self.seen.push(match *request {
            AccelRequest::Blit {
                dst_x, dst_y, src_rect, ..
            } => Recorded::Blit { dst_x, dst_y, src_rect },
            AccelRequest::ScaledBlit { dst, src_rect, .. } => Recorded::ScaledBlit { dst, src_rect },
            ref other => Recorded::Other(other.capability()),
        });
        self.take
    }
}
