//! Combine mode encoding
//!
//! | bits      | meaning                                              |
//! |-----------|------------------------------------------------------|
//! | 0-3       | operator id ([`Operator`])                           |
//! | 4-5       | channel-copy source channel                          |
//! | 6-7       | channel-copy destination channel                     |
//! | 8         | bilinear filtering                                   |
//! | 16        | weight by the source alpha channel                   |
//! | 17        | constant alpha only (wins over bit 16)               |
//!
//! Operator and flags are independent; every bit pattern resolves to exactly
//! one combine function.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::pixel::{ALPHA_SHIFT, BLUE_SHIFT, GREEN_SHIFT, RED_SHIFT};

const OPERATOR_MASK: u32 = 0xf;
const CHANNEL_SRC_SHIFT: u32 = 4;
const CHANNEL_DST_SHIFT: u32 = 6;

/// Blend operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Copy = 0,
    Add = 1,
    Dodge = 2,
    Multiply = 3,
    Overlay = 4,
    Subtract = 5,
    Colorize = 6,
    ChannelCopy = 15,
}

impl Operator {
    /// Resolve an operator id. Reserved ids (7..=14) and anything else fall
    /// back to `Copy`.
    pub const fn from_id(id: u32) -> Self {
        match id & OPERATOR_MASK {
            1 => Self::Add,
            2 => Self::Dodge,
            3 => Self::Multiply,
            4 => Self::Overlay,
            5 => Self::Subtract,
            6 => Self::Colorize,
            15 => Self::ChannelCopy,
            _ => Self::Copy,
        }
    }

    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }
}

/// Channel index, as used by channel-copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Blue = 0,
    Green = 1,
    Red = 2,
    Alpha = 3,
}

impl Channel {
    pub const fn from_index(index: u32) -> Self {
        match index & 3 {
            0 => Self::Blue,
            1 => Self::Green,
            2 => Self::Red,
            _ => Self::Alpha,
        }
    }

    /// Bit offset of this channel inside a [`Pixel`](crate::pixel::Pixel)
    #[inline]
    pub const fn shift(self) -> u32 {
        match self {
            Self::Blue => BLUE_SHIFT,
            Self::Green => GREEN_SHIFT,
            Self::Red => RED_SHIFT,
            Self::Alpha => ALPHA_SHIFT,
        }
    }
}

bitflags! {
    /// Orthogonal mode flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlitFlags: u32 {
        const BILINEAR = 0x100;
        const USE_SOURCE_ALPHA = 0x1_0000;
        const CONSTANT_ALPHA = 0x2_0000;
    }
}

/// Sampling policy for resampling blits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Bilinear,
}

/// A complete combine mode: operator id plus flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlitMode(u32);

impl BlitMode {
    pub const COPY: Self = Self(0);
    pub const ADD: Self = Self(Operator::Add as u32);
    pub const DODGE: Self = Self(Operator::Dodge as u32);
    pub const MULTIPLY: Self = Self(Operator::Multiply as u32);
    pub const OVERLAY: Self = Self(Operator::Overlay as u32);
    pub const SUBTRACT: Self = Self(Operator::Subtract as u32);
    pub const COLORIZE: Self = Self(Operator::Colorize as u32);

    /// Wrap a raw encoded mode
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn new(op: Operator) -> Self {
        Self(op as u32)
    }

    /// Channel copy: write channel `src` of the source into channel `dst`
    pub const fn channel_copy(src: Channel, dst: Channel) -> Self {
        Self(
            Operator::ChannelCopy as u32
                | (src as u32) << CHANNEL_SRC_SHIFT
                | (dst as u32) << CHANNEL_DST_SHIFT,
        )
    }

    #[must_use]
    pub const fn with(self, flags: BlitFlags) -> Self {
        Self(self.0 | flags.bits())
    }

    #[inline]
    pub const fn operator(self) -> Operator {
        Operator::from_id(self.0)
    }

    #[inline]
    pub const fn flags(self) -> BlitFlags {
        BlitFlags::from_bits_truncate(self.0)
    }

    /// `(source, destination)` channels for channel-copy
    pub const fn channel_selector(self) -> (Channel, Channel) {
        (
            Channel::from_index(self.0 >> CHANNEL_SRC_SHIFT),
            Channel::from_index(self.0 >> CHANNEL_DST_SHIFT),
        )
    }

    #[inline]
    pub const fn filter(self) -> Filter {
        if self.0 & BlitFlags::BILINEAR.bits() != 0 {
            Filter::Bilinear
        } else {
            Filter::Nearest
        }
    }

    /// Whether the source alpha channel feeds the weight. Constant-alpha wins.
    #[inline]
    pub const fn uses_source_alpha(self) -> bool {
        self.0 & BlitFlags::USE_SOURCE_ALPHA.bits() != 0
            && self.0 & BlitFlags::CONSTANT_ALPHA.bits() == 0
    }

    /// Plain COPY: no filter, no per-pixel alpha
    #[inline]
    pub const fn is_plain_copy(self) -> bool {
        matches!(self.operator(), Operator::Copy)
            && !self.uses_source_alpha()
            && matches!(self.filter(), Filter::Nearest)
    }
}

impl From<Operator> for BlitMode {
    fn from(op: Operator) -> Self {
        Self::new(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_roundtrip_and_reserved_ids() {
        for op in [
            Operator::Copy,
            Operator::Add,
            Operator::Dodge,
            Operator::Multiply,
            Operator::Overlay,
            Operator::Subtract,
            Operator::Colorize,
            Operator::ChannelCopy,
        ] {
            assert_eq!(Operator::from_id(op.id()), op);
        }
        for id in 7..15 {
            assert_eq!(Operator::from_id(id), Operator::Copy);
        }
    }

    #[test]
    fn test_flags_are_independent_of_operator() {
        let mode = BlitMode::ADD.with(BlitFlags::BILINEAR | BlitFlags::USE_SOURCE_ALPHA);
        assert_eq!(mode.operator(), Operator::Add);
        assert_eq!(mode.filter(), Filter::Bilinear);
        assert!(mode.uses_source_alpha());
        assert!(!mode.is_plain_copy());
    }

    #[test]
    fn test_constant_alpha_overrides_source_alpha() {
        let mode = BlitMode::COPY.with(BlitFlags::USE_SOURCE_ALPHA | BlitFlags::CONSTANT_ALPHA);
        assert!(!mode.uses_source_alpha());
        assert!(mode.is_plain_copy());
    }

    #[test]
    fn test_channel_selector() {
        let mode = BlitMode::channel_copy(Channel::Alpha, Channel::Green);
        assert_eq!(mode.operator(), Operator::ChannelCopy);
        assert_eq!(mode.channel_selector(), (Channel::Alpha, Channel::Green));
        assert_eq!(mode.bits() & 0xff, 0x7f);
    }

    #[test]
    fn test_mode_serializes_as_raw_bits() {
        let mode = BlitMode::MULTIPLY.with(BlitFlags::BILINEAR);
        let json = serde_json::to_string(&mode).unwrap();
        assert_eq!(json, "259");
        let back: BlitMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mode);
    }
}
