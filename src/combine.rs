//! Pixel combine operators
//!
//! Every operator implements [`Combine`]: given the destination pixel, the
//! source channels and a weight in `0..=256`, it rewrites the destination in
//! place. At weight 0 every operator leaves the destination untouched.
//!
//! Rasterizers never branch on the mode per pixel. They call
//! [`Strategy::blend`] / [`Strategy::constant`] once, then hand the strategy to
//! [`dispatch!`], which binds the concrete operator type and runs the inner
//! loop with it.

use crate::mode::{BlitMode, Channel, Operator};
use crate::pixel::{channels, clamp_channel, lerp, pack, pack_clamped, Pixel};

/// Per-pixel combine function
pub trait Combine {
    fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32);
}

impl<C: Combine + ?Sized> Combine for &C {
    #[inline]
    fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
        (**self).apply(dest, r, g, b, a, alpha);
    }
}

/// The operator structs. All are zero-sized except [`ChannelCopy`].
pub mod ops {
    use super::*;

    #[inline]
    fn mix(s: i32, d: i32, alpha: i32) -> i32 {
        (s * alpha + d * (256 - alpha)) >> 8
    }

    /// Overwrite (opaque copy, in-range input)
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Clobber;

    impl Combine for Clobber {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, _alpha: i32) {
            *dest = pack(r, g, b, a);
        }
    }

    /// Weighted copy without saturation, on packed lanes
    ///
    /// Only valid for channels already in 0..=255; the weights sum to one so
    /// no channel can leave that range.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Copy;

    impl Combine for Copy {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            *dest = lerp(*dest, pack(r, g, b, a), alpha as u32);
        }
    }

    /// Weighted copy, saturated per channel
    #[derive(Debug, Clone, Copy, Default)]
    pub struct CopyClamp;

    impl Combine for CopyClamp {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            let (dr, dg, db, da) = channels(*dest);
            *dest = pack_clamped(mix(r, dr, alpha), mix(g, dg, alpha), mix(b, db, alpha), mix(a, da, alpha));
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct Add;

    impl Combine for Add {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            let (dr, dg, db, da) = channels(*dest);
            *dest = pack_clamped(
                dr + ((r * alpha) >> 8),
                dg + ((g * alpha) >> 8),
                db + ((b * alpha) >> 8),
                da + ((a * alpha) >> 8),
            );
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct Subtract;

    impl Combine for Subtract {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            let (dr, dg, db, da) = channels(*dest);
            *dest = pack_clamped(
                dr - ((r * alpha) >> 8),
                dg - ((g * alpha) >> 8),
                db - ((b * alpha) >> 8),
                da - ((a * alpha) >> 8),
            );
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct Multiply;

    impl Combine for Multiply {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            // White at weight w and the identity at 256-w, scaled by 255*256
            let keep = 255 * (256 - alpha);
            let m = |s: i32, d: i32| d * (clamp_channel(s) * alpha + keep) / (255 * 256);
            let (dr, dg, db, da) = channels(*dest);
            *dest = pack_clamped(m(r, dr), m(g, dg), m(b, db), m(a, da));
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct Dodge;

    impl Combine for Dodge {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            let dodge = |s: i32, d: i32| (d * 256) / (256 - ((s * alpha) >> 8)).max(1);
            let (dr, dg, db, da) = channels(*dest);
            *dest = pack_clamped(dodge(r, dr), dodge(g, dg), dodge(b, db), dodge(a, da));
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct Overlay;

    impl Combine for Overlay {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            let overlay = |s: i32, d: i32| {
                let s = clamp_channel(s);
                let o = if d < 128 {
                    2 * d * s / 255
                } else {
                    255 - 2 * (255 - d) * (255 - s) / 255
                };
                mix(o, d, alpha)
            };
            let (dr, dg, db, da) = channels(*dest);
            *dest = pack_clamped(overlay(r, dr), overlay(g, dg), overlay(b, db), overlay(a, da));
        }
    }

    /// Source colour scaled by destination luma; destination alpha kept
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Colorize;

    impl Combine for Colorize {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, _a: i32, alpha: i32) {
            let (dr, dg, db, da) = channels(*dest);
            let luma = (77 * dr + 151 * dg + 28 * db) >> 8;
            let tint = |s: i32, d: i32| mix(clamp_channel(s) * luma / 255, d, alpha);
            *dest = pack_clamped(tint(r, dr), tint(g, dg), tint(b, db), da);
        }
    }

    /// Mix one source channel into one destination channel
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelCopy {
        pub src: Channel,
        pub dst: Channel,
    }

    impl Combine for ChannelCopy {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            let v = match self.src {
                Channel::Blue => b,
                Channel::Green => g,
                Channel::Red => r,
                Channel::Alpha => a,
            };
            let shift = self.dst.shift();
            let d = ((*dest >> shift) & 0xff) as i32;
            let out = clamp_channel(mix(v, d, alpha)) as u32;
            *dest = (*dest & !(0xff << shift)) | (out << shift);
        }
    }

    /// Scales the weight by the source alpha channel before delegating
    #[derive(Debug, Clone, Copy)]
    pub struct SourceAlpha<C>(pub C);

    impl<C: Combine> Combine for SourceAlpha<C> {
        #[inline]
        fn apply(&self, dest: &mut Pixel, r: i32, g: i32, b: i32, a: i32, alpha: i32) {
            // a + (a >> 7) maps 0..=255 onto 0..=256 with both ends exact
            let w = (alpha * (a + (a >> 7))) >> 8;
            if w > 0 {
                self.0.apply(dest, r, g, b, a, w);
            }
        }
    }
}

pub use ops::SourceAlpha;

// ============================================================================
// Strategy resolution
// ============================================================================

/// The concrete operator a call resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Clobber,
    Copy,
    CopyClamp,
    Add,
    Subtract,
    Multiply,
    Dodge,
    Overlay,
    Colorize,
    ChannelCopy(ops::ChannelCopy),
}

/// A combine function picked once per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    kind: Kind,
    source_alpha: bool,
}

impl Strategy {
    /// Strategy for sampled source pixels.
    ///
    /// Honors the source-alpha flag. Opaque COPY without source alpha turns
    /// into a plain overwrite. `None` when nothing would be written.
    pub fn blend(mode: BlitMode, weight: i32) -> Option<Self> {
        if weight <= 0 {
            return None;
        }
        if mode.uses_source_alpha() {
            return Some(Self {
                kind: Self::operator_kind(mode, false),
                source_alpha: true,
            });
        }
        if weight >= 256 && mode.operator() == Operator::Copy {
            return Some(Self {
                kind: Kind::Clobber,
                source_alpha: false,
            });
        }
        Self::constant(mode, weight, false)
    }

    /// Strategy that ignores any per-pixel source alpha. `clamp` selects the
    /// saturating COPY for inputs that may leave 0..=255.
    pub fn constant(mode: BlitMode, weight: i32, clamp: bool) -> Option<Self> {
        (weight > 0).then(|| Self {
            kind: Self::operator_kind(mode, clamp),
            source_alpha: false,
        })
    }

    fn operator_kind(mode: BlitMode, clamp: bool) -> Kind {
        match mode.operator() {
            Operator::Copy if clamp => Kind::CopyClamp,
            Operator::Copy => Kind::Copy,
            Operator::Add => Kind::Add,
            Operator::Subtract => Kind::Subtract,
            Operator::Multiply => Kind::Multiply,
            Operator::Dodge => Kind::Dodge,
            Operator::Overlay => Kind::Overlay,
            Operator::Colorize => Kind::Colorize,
            Operator::ChannelCopy => {
                let (src, dst) = mode.channel_selector();
                Kind::ChannelCopy(ops::ChannelCopy { src, dst })
            }
        }
    }

    #[inline]
    pub const fn kind(self) -> Kind {
        self.kind
    }

    #[inline]
    pub const fn source_alpha(self) -> bool {
        self.source_alpha
    }

    /// Run `f` with this strategy as a trait object
    pub fn with_dyn<R>(self, f: impl FnOnce(&dyn Combine) -> R) -> R {
        macro_rules! call {
            ($op:expr) => {
                if self.source_alpha {
                    f(&SourceAlpha($op))
                } else {
                    f(&$op)
                }
            };
        }
        match self.kind {
            Kind::Clobber => call!(ops::Clobber),
            Kind::Copy => call!(ops::Copy),
            Kind::CopyClamp => call!(ops::CopyClamp),
            Kind::Add => call!(ops::Add),
            Kind::Subtract => call!(ops::Subtract),
            Kind::Multiply => call!(ops::Multiply),
            Kind::Dodge => call!(ops::Dodge),
            Kind::Overlay => call!(ops::Overlay),
            Kind::Colorize => call!(ops::Colorize),
            Kind::ChannelCopy(cc) => call!(cc),
        }
    }
}

/// Bind `$c` to the concrete operator for `$strategy` and evaluate `$body`.
///
/// Each operator gets its own copy of `$body`, so inner loops are
/// monomorphized. Pass `&$c` to functions generic over `C: Combine + ?Sized`.
#[cfg(not(feature = "favor-size"))]
macro_rules! dispatch {
    (@alpha $strategy:ident, $op:expr, $c:ident, $body:expr) => {
        if $strategy.source_alpha() {
            let $c = $crate::combine::SourceAlpha($op);
            $body
        } else {
            let $c = $op;
            $body
        }
    };
    ($strategy:expr, |$c:ident| $body:expr) => {{
        let strategy: $crate::combine::Strategy = $strategy;
        match strategy.kind() {
            $crate::combine::Kind::Clobber => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::Clobber, $c, $body)
            }
            $crate::combine::Kind::Copy => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::Copy, $c, $body)
            }
            $crate::combine::Kind::CopyClamp => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::CopyClamp, $c, $body)
            }
            $crate::combine::Kind::Add => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::Add, $c, $body)
            }
            $crate::combine::Kind::Subtract => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::Subtract, $c, $body)
            }
            $crate::combine::Kind::Multiply => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::Multiply, $c, $body)
            }
            $crate::combine::Kind::Dodge => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::Dodge, $c, $body)
            }
            $crate::combine::Kind::Overlay => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::Overlay, $c, $body)
            }
            $crate::combine::Kind::Colorize => {
                $crate::combine::dispatch!(@alpha strategy, $crate::combine::ops::Colorize, $c, $body)
            }
            $crate::combine::Kind::ChannelCopy(cc) => {
                $crate::combine::dispatch!(@alpha strategy, cc, $c, $body)
            }
        }
    }};
}

/// Size-favoring build: one `&dyn Combine` instantiation of `$body`.
#[cfg(feature = "favor-size")]
macro_rules! dispatch {
    ($strategy:expr, |$c:ident| $body:expr) => {{
        let strategy: $crate::combine::Strategy = $strategy;
        strategy.with_dyn(|$c: &dyn $crate::combine::Combine| $body)
    }};
}

pub(crate) use dispatch;

// ============================================================================
// Single-pixel entry points
// ============================================================================

/// Combine one source pixel into `dest` at constant `alpha` (0.0..=1.0)
pub fn combine_pixels(dest: Pixel, src: Pixel, alpha: f32, mode: BlitMode) -> Pixel {
    let mut out = dest;
    let weight = crate::raster::alpha_weight(alpha);
    if let Some(strategy) = Strategy::blend(mode, weight) {
        let (r, g, b, a) = channels(src);
        strategy.with_dyn(|c| c.apply(&mut out, r, g, b, a, weight));
    }
    out
}

/// Combine raw channels into `dest` at an explicit weight (0..=256).
///
/// Source alpha is honored when `mode` asks for it. `clamp` selects the
/// saturating COPY, needed when channels may leave 0..=255.
pub fn combine_weighted(
    dest: &mut Pixel,
    r: i32,
    g: i32,
    b: i32,
    a: i32,
    weight: i32,
    mode: BlitMode,
    clamp: bool,
) {
    let weight = weight.min(256);
    let strategy = if mode.uses_source_alpha() || !clamp {
        Strategy::blend(mode, weight)
    } else {
        Strategy::constant(mode, weight, true)
    };
    if let Some(strategy) = strategy {
        strategy.with_dyn(|c| c.apply(dest, r, g, b, a, weight));
    }
}
