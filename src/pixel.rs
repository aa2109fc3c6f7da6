//! Packed 32-bit pixels
//!
//! Layout is `b | g << 8 | r << 16 | a << 24` for every bitmap in the process.
//! Everything outside this module goes through [`pack`] / [`channels`] for
//! channel order; the masked helpers below are the only places that treat a
//! pixel as a plain word.

/// A packed, non-premultiplied pixel.
pub type Pixel = u32;

pub const BLUE_SHIFT: u32 = 0;
pub const GREEN_SHIFT: u32 = 8;
pub const RED_SHIFT: u32 = 16;
pub const ALPHA_SHIFT: u32 = 24;

/// Clears the top bit of every channel after a one-bit shift.
pub const HALF_MASK: u32 = 0x7f7f7f7f;
pub const QUARTER_MASK: u32 = 0x3f3f3f3f;
pub const EIGHTH_MASK: u32 = 0x1f1f1f1f;
/// Two 8-bit lanes with 8 bits of headroom each (`b`/`r` or `g`/`a`).
pub const LANE_MASK: u32 = 0x00ff00ff;

pub const RGB_MASK: u32 = 0x00ffffff;
pub const ALPHA_MASK: u32 = 0xff000000;

/// Build a pixel from 8-bit channels
#[inline]
pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Pixel {
    (b as u32) << BLUE_SHIFT | (g as u32) << GREEN_SHIFT | (r as u32) << RED_SHIFT | (a as u32) << ALPHA_SHIFT
}

/// Pack channels, keeping only the low 8 bits of each (no saturation)
#[inline]
pub const fn pack(r: i32, g: i32, b: i32, a: i32) -> Pixel {
    (b as u32 & 0xff) << BLUE_SHIFT
        | (g as u32 & 0xff) << GREEN_SHIFT
        | (r as u32 & 0xff) << RED_SHIFT
        | (a as u32 & 0xff) << ALPHA_SHIFT
}

/// Pack channels, saturating each to 0..=255
#[inline]
pub fn pack_clamped(r: i32, g: i32, b: i32, a: i32) -> Pixel {
    pack(clamp_channel(r), clamp_channel(g), clamp_channel(b), clamp_channel(a))
}

#[inline]
pub fn clamp_channel(v: i32) -> i32 {
    v.clamp(0, 255)
}

/// Unpack into `(r, g, b, a)`
#[inline]
pub const fn channels(p: Pixel) -> (i32, i32, i32, i32) {
    (
        ((p >> RED_SHIFT) & 0xff) as i32,
        ((p >> GREEN_SHIFT) & 0xff) as i32,
        ((p >> BLUE_SHIFT) & 0xff) as i32,
        ((p >> ALPHA_SHIFT) & 0xff) as i32,
    )
}

#[inline]
pub const fn alpha(p: Pixel) -> i32 {
    ((p >> ALPHA_SHIFT) & 0xff) as i32
}

// ============================================================================
// Masked packed arithmetic
// ============================================================================
//
// Each helper works on all four channels at once. The shifted masks drop the
// bits that would otherwise leak from one channel into its lower neighbour,
// so results equal the per-channel `>> n`. Sums of these terms are only valid
// while the weights add up to at most one (no channel can carry).

/// Every channel halved (`c >> 1`)
#[inline]
pub const fn half(p: Pixel) -> Pixel {
    (p >> 1) & HALF_MASK
}

/// Every channel quartered (`c >> 2`)
#[inline]
pub const fn quarter(p: Pixel) -> Pixel {
    (p >> 2) & QUARTER_MASK
}

/// Every channel divided by eight (`c >> 3`)
#[inline]
pub const fn eighth(p: Pixel) -> Pixel {
    (p >> 3) & EIGHTH_MASK
}

/// Per-channel `(a + b) >> 1`, exact
///
/// Shared bits are kept whole and only the differing bits are halved, so no
/// channel can overflow.
#[inline]
pub const fn average(a: Pixel, b: Pixel) -> Pixel {
    (a & b) + half(a ^ b)
}

/// Two-lane weighted mix: per channel `(src*ws + dest*wd) >> shift`, where
/// `ws + wd == 1 << shift` and `shift <= 8`.
#[inline]
const fn mix_lanes(dest: Pixel, src: Pixel, ws: u32, wd: u32, shift: u32) -> Pixel {
    let rb = (((src & LANE_MASK) * ws + (dest & LANE_MASK) * wd) >> shift) & LANE_MASK;
    let ga = ((((src >> 8) & LANE_MASK) * ws + ((dest >> 8) & LANE_MASK) * wd) >> shift) & LANE_MASK;
    rb | (ga << 8)
}

/// One quarter `src`, three quarters `dest`
#[inline]
pub const fn mix_quarter(dest: Pixel, src: Pixel) -> Pixel {
    mix_lanes(dest, src, 1, 3, 2)
}

/// Three quarters `src`, one quarter `dest`
#[inline]
pub const fn mix_three_quarters(dest: Pixel, src: Pixel) -> Pixel {
    mix_lanes(dest, src, 3, 1, 2)
}

/// Per channel `(src*w + dest*(256-w)) >> 8`, `w` in 0..=256
#[inline]
pub const fn lerp(dest: Pixel, src: Pixel, weight: u32) -> Pixel {
    mix_lanes(dest, src, weight, 256 - weight, 8)
}
