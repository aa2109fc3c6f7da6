//! Software pixel compositing over 32-bit bitmaps.
//!
//! The engine samples a source region (straight, scaled, rotated or
//! affine-warped) and combines each sample into a destination bitmap under
//! a blend operator, with constant and optional per-pixel alpha. It also
//! provides solid and gradient fills, a box blur and a few whole-bitmap
//! pixel transforms.
//!
//! ```
//! use pixblit::{raster, BlitMode, MemBitmap, Rect, RectF};
//!
//! let mut src = MemBitmap::new(8, 8);
//! raster::fill_rect(&mut src, Rect::new(0, 0, 8, 8), pixblit::pixel::rgba(255, 0, 0, 255), 1.0, BlitMode::COPY);
//!
//! let mut dest = MemBitmap::new(16, 16);
//! raster::scaled_blit(&mut dest, &src, Rect::new(0, 0, 16, 16), RectF::new(0.0, 0.0, 8.0, 8.0), 1.0, BlitMode::COPY);
//! assert_eq!(dest.pixel(15, 15), src.pixel(7, 7));
//! ```
//!
//! Rasterizer calls never fail: degenerate input is a silent no-op. Only
//! configuration files and image loading return [`Result`].

pub mod bitmap;
pub mod combine;
pub mod config;
pub mod error;
pub mod geom;
pub mod loader;
pub mod mode;
pub mod pixel;
pub mod raster;

#[cfg(test)]
mod testutil;

pub use bitmap::{AccelRequest, Bitmap, Capability, MemBitmap};
pub use combine::{combine_pixels, combine_weighted, Combine, Strategy};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use geom::{Rect, RectF};
pub use loader::{ImageLoader, LoaderId, LoaderRegistry};
pub use mode::{BlitFlags, BlitMode, Channel, Filter, Operator};
pub use pixel::Pixel;
pub use raster::{
    blit, blur, blur_in_place, clear, copy, delta_blit, fill_rect, grad_rect, rotated_blit,
    scaled_blit, transform_blit, DeltaSteps, Gradient,
};
