use log::{debug, error, warn};

use super::Bitmap;
use crate::config::EngineConfig;
use crate::pixel::Pixel;

/// Largest row alignment mask (16 pixels)
const MAX_ALIGN_MASK: i32 = 15;

// ============================================================================
// MemBitmap
// ============================================================================

/// Growable in-memory bitmap
///
/// Geometry and capacity are tracked separately. Shrinking only updates the
/// geometry; the buffer is never given back.
#[derive(Debug, Clone)]
pub struct MemBitmap {
    pixels: Vec<Pixel>,
    width: i32,
    height: i32,
    span: i32,
    /// Row span is rounded up to `align_mask + 1`
    align_mask: i32,
    growth_divisor: usize,
    flipped: bool,
    allocations: usize,
}

impl MemBitmap {
    /// Create a bitmap with default policy, cleared to zero
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_config(width, height, &EngineConfig::default())
    }

    /// Create a bitmap whose rows are padded to a multiple of `line_align`
    pub fn with_line_align(width: i32, height: i32, line_align: u32) -> Self {
        let config = EngineConfig {
            line_align,
            ..EngineConfig::default()
        };
        Self::with_config(width, height, &config)
    }

    pub fn with_config(width: i32, height: i32, config: &EngineConfig) -> Self {
        let mut bm = Self {
            pixels: Vec::new(),
            width: 0,
            height: 0,
            span: 0,
            align_mask: align_mask(config.line_align),
            growth_divisor: config.growth_divisor as usize,
            flipped: false,
            allocations: 0,
        };
        bm.resize(width, height);
        bm
    }

    /// Store rows bottom-up. Reinterprets existing content.
    pub fn set_flipped(&mut self, flipped: bool) {
        self.flipped = flipped;
    }

    /// Allocated pixels
    #[inline]
    pub fn capacity(&self) -> usize {
        self.pixels.len()
    }

    /// Number of times the buffer has been (re)allocated
    #[inline]
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let row = if self.flipped { self.height - 1 - y } else { y };
        Some(row as usize * self.span as usize + x as usize)
    }

    /// Pixel at logical `(x, y)`, `None` outside the bitmap
    pub fn pixel(&self, x: i32, y: i32) -> Option<Pixel> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Overwrite the pixel at logical `(x, y)`; ignored outside the bitmap
    pub fn set_pixel(&mut self, x: i32, y: i32, p: Pixel) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = p;
        }
    }

    /// Logical row `y`, `width` pixels long
    pub fn row(&self, y: i32) -> &[Pixel] {
        match self.index(0, y) {
            Some(i) => &self.pixels[i..i + self.width as usize],
            None => &[],
        }
    }

    fn grow(&mut self, needed: usize) {
        // First allocation is exact; later ones leave headroom
        let target = if self.pixels.is_empty() || self.growth_divisor == 0 {
            needed
        } else {
            needed + needed / self.growth_divisor
        };
        if self.pixels.try_reserve_exact(target - self.pixels.len()).is_ok() {
            self.pixels.resize(target, 0);
            self.allocations += 1;
            debug!("bitmap buffer grown to {} pixels", target);
            return;
        }

        warn!("failed to grow bitmap buffer to {} pixels, retrying at {}", target, needed);
        self.pixels = Vec::new();
        if self.pixels.try_reserve_exact(needed).is_ok() {
            self.pixels.resize(needed, 0);
            self.allocations += 1;
            return;
        }

        error!("failed to allocate {} pixels, bitmap is now empty", needed);
        self.make_empty();
    }

    fn make_empty(&mut self) {
        self.width = 0;
        self.height = 0;
        self.span = 0;
    }
}

/// Power-of-two alignment mask for a requested line alignment
fn align_mask(line_align: u32) -> i32 {
    if line_align <= 1 {
        return 0;
    }
    // Lowest set bit keeps the alignment a power of two
    let pow2 = line_align & line_align.wrapping_neg();
    (pow2 as i32 - 1).min(MAX_ALIGN_MASK)
}

impl Bitmap for MemBitmap {
    #[inline]
    fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    fn row_span(&self) -> i32 {
        self.span
    }

    #[inline]
    fn is_flipped(&self) -> bool {
        self.flipped
    }

    #[inline]
    fn bits(&self) -> &[Pixel] {
        &self.pixels
    }

    #[inline]
    fn bits_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Content is unspecified after a geometry change
    fn resize(&mut self, width: i32, height: i32) -> bool {
        let (width, height) = (width.max(0), height.max(0));
        if width == self.width && height == self.height {
            return false;
        }
        let Some(padded) = width.checked_add(self.align_mask) else {
            error!("bitmap width {} overflows the row span, bitmap is now empty", width);
            let changed = self.width != 0 || self.height != 0;
            self.make_empty();
            return changed;
        };
        self.width = width;
        self.height = height;
        self.span = padded & !self.align_mask;

        let needed = self.span as usize * height as usize;
        if needed > self.pixels.len() {
            self.grow(needed);
        }
        true
    }
}
