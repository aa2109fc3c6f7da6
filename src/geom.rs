//! Rectangles

use serde::{Deserialize, Serialize};

/// Integer rectangle. Negative extents are meaningful to the resampling
/// blits (they mirror the blit); everywhere else they are simply empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Intersection with `0..width` x `0..height`. May come out empty.
    pub fn clip_to(&self, width: i32, height: i32) -> Self {
        let x = self.x.max(0);
        let y = self.y.max(0);
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        Self::new(x, y, right - x, bottom - y)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Sub-pixel source rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

impl From<Rect> for RectF {
    fn from(r: Rect) -> Self {
        Self::new(r.x as f32, r.y as f32, r.w as f32, r.h as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_to() {
        let r = Rect::new(-2, 3, 10, 10).clip_to(6, 8);
        assert_eq!(r, Rect::new(0, 3, 6, 5));
        assert!(!r.is_empty());
        assert!(Rect::new(7, 0, 3, 3).clip_to(6, 8).is_empty());
    }

    #[test]
    fn test_contains_is_half_open() {
        let r = Rect::new(1, 1, 2, 2);
        assert!(r.contains(1, 1));
        assert!(r.contains(2, 2));
        assert!(!r.contains(3, 2));
    }
}
