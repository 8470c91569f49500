//! Packed 16-bit panel colors
//!
//! The panel stores every pixel as 5 bits red, 6 bits green and 5 bits blue.
//! Conversion from 8-bit channels truncates the low bits, conversion back
//! shifts the packed channel up without replicating bits, so a round trip
//! loses precision but stays within `0xF8/0xFC/0xF8` of the original.

use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::RawData;

/// A 5/6/5 packed panel color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedColor(u16);

impl PackedColor {
    /// All channels off
    pub const BLACK: Self = Self(0x0000);
    /// All channels at full scale
    pub const WHITE: Self = Self(0xFFFF);
    /// Full red
    pub const RED: Self = Self(0xF800);
    /// Full green
    pub const GREEN: Self = Self(0x07E0);
    /// Full blue
    pub const BLUE: Self = Self(0x001F);

    /// Wrap an already packed value
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The packed 16-bit value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Pack 8-bit channels, dropping the low 3/2/3 bits
    // SAFETY: masked channels shifted into their fields never exceed 0xFFFF.
    #[allow(clippy::arithmetic_side_effects)]
    pub const fn from_rgb888(r: u8, g: u8, b: u8) -> Self {
        let r = (r as u16 & 0xF8) << 8;
        let g = (g as u16 & 0xFC) << 3;
        let b = b as u16 >> 3;
        Self(r | g | b)
    }

    /// Unpack to 8-bit channels (`r5 << 3`, `g6 << 2`, `b5 << 3`)
    // SAFETY: each masked channel is at most 0x3F, so the shifted value
    // stays below 0x100 and the narrowing cast is lossless.
    #[allow(clippy::cast_possible_truncation, clippy::arithmetic_side_effects)]
    pub const fn to_rgb888(self) -> (u8, u8, u8) {
        let r = ((self.0 >> 11) & 0x1F) << 3;
        let g = ((self.0 >> 5) & 0x3F) << 2;
        let b = (self.0 & 0x1F) << 3;
        (r as u8, g as u8, b as u8)
    }

    /// Multiply every unpacked channel by `factor` (clamped to `0.0..=1.0`),
    /// round to nearest and pack again.
    pub fn scaled(self, factor: f64) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let (r, g, b) = self.to_rgb888();
        Self::from_rgb888(
            scale_channel(r, factor),
            scale_channel(g, factor),
            scale_channel(b, factor),
        )
    }

    /// Parse `#RRGGBB`. Returns `None` when malformed.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: core::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };
        Some(Self::from_rgb888(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Scale one 8-bit channel, rounding half away from zero.
// SAFETY: factor is clamped to 0..=1, so the product lies in 0..=255 and the
// cast cannot truncate or change sign.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn scale_channel(value: u8, factor: f64) -> u8 {
    (f64::from(value) * factor).round().clamp(0.0, 255.0) as u8
}

impl From<PackedColor> for Rgb565 {
    fn from(color: PackedColor) -> Self {
        Rgb565::from(RawU16::new(color.0))
    }
}

impl From<Rgb565> for PackedColor {
    fn from(color: Rgb565) -> Self {
        PackedColor(RawU16::from(color).into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::RgbColor;

    #[test]
    fn test_pack_known_values() {
        assert_eq!(PackedColor::from_rgb888(255, 0, 0), PackedColor::RED);
        assert_eq!(PackedColor::from_rgb888(0, 255, 0), PackedColor::GREEN);
        assert_eq!(PackedColor::from_rgb888(0, 0, 255), PackedColor::BLUE);
        assert_eq!(PackedColor::from_rgb888(255, 255, 255), PackedColor::WHITE);
    }

    #[test]
    fn test_unpack_white_is_not_full_scale() {
        assert_eq!(PackedColor::WHITE.to_rgb888(), (248, 252, 248));
    }

    #[test]
    fn test_scale_half() {
        // 248 * 0.5 = 124 -> packed 124 & 0xF8 = 120
        let half = PackedColor::RED.scaled(0.5);
        assert_eq!(half.to_rgb888(), (120, 0, 0));
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(PackedColor::from_hex("#FF0000"), Some(PackedColor::RED));
        assert_eq!(PackedColor::from_hex("#00ff00"), Some(PackedColor::GREEN));
        assert_eq!(PackedColor::from_hex("00ff00"), None);
        assert_eq!(PackedColor::from_hex("#12"), None);
        assert_eq!(PackedColor::from_hex("#GG0000"), None);
        assert_eq!(PackedColor::from_hex(""), None);
    }

    #[test]
    fn test_rgb565_interop() {
        let color: Rgb565 = PackedColor::RED.into();
        assert_eq!(color, Rgb565::RED);
        assert_eq!(PackedColor::from(Rgb565::BLUE), PackedColor::BLUE);
    }
}
