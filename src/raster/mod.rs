//! Rasterizer entry points
//!
//! All entry points are infallible. Degenerate input (empty rectangles,
//! non-positive alpha, bitmaps without storage) is a silent no-op.

mod affine;
mod blit;
mod blur;
mod fill;
mod sample;
mod scaled;

pub use affine::{delta_blit, rotated_blit, transform_blit, DeltaSteps};
pub use blit::{blit, copy};
pub use blur::{blur, blur_in_place, halve_blit_aa};
pub use fill::{
    clear, clear_rect, fill_rect, get_pixel, grad_rect, multiply_add_rect, process_rect, put_pixel,
    set_alpha_from_color_mask, Gradient,
};
pub use scaled::scaled_blit;

/// 16.16 fixed point unit
pub(crate) const FIXED_ONE: i32 = 1 << 16;

/// Constant alpha (0.0..=1.0) to a weight in 0..=256
#[inline]
pub fn alpha_weight(alpha: f32) -> i32 {
    ((alpha * 256.0) as i32).clamp(0, 256)
}

/// Float to 16.16, truncating
#[inline]
pub(crate) fn to_fixed(v: f64) -> i32 {
    (v * f64::from(FIXED_ONE)) as i32
}
