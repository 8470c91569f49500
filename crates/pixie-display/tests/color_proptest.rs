//! Property-based tests for packed color math and brightness rendering.
//! Verifies invariants hold for ALL channel values, not just fixed examples.

use pixie_display::{PackedColor, PixelDisplay};

proptest::proptest! {
    /// Packing then unpacking only ever drops the low 3/2/3 bits.
    #[test]
    fn round_trip_loses_only_low_bits(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
        let (r2, g2, b2) = PackedColor::from_rgb888(r, g, b).to_rgb888();
        assert_eq!(r2, r & 0xF8);
        assert_eq!(g2, g & 0xFC);
        assert_eq!(b2, b & 0xF8);
    }

    /// Unpacking then repacking is the identity on packed values.
    #[test]
    fn repack_is_identity(raw in 0u16..=u16::MAX) {
        let color = PackedColor::from_raw(raw);
        let (r, g, b) = color.to_rgb888();
        assert_eq!(PackedColor::from_rgb888(r, g, b), color);
    }

    /// Scaling by 1 keeps the color, scaling by 0 yields black.
    #[test]
    fn scale_endpoints(raw in 0u16..=u16::MAX) {
        let color = PackedColor::from_raw(raw);
        assert_eq!(color.scaled(1.0), color);
        assert_eq!(color.scaled(0.0), PackedColor::BLACK);
    }

    /// Scaling never brightens any channel.
    #[test]
    fn scale_is_monotone(raw in 0u16..=u16::MAX, factor in 0.0f64..=1.0) {
        let color = PackedColor::from_raw(raw);
        let (r, g, b) = color.to_rgb888();
        let (sr, sg, sb) = color.scaled(factor).to_rgb888();
        assert!(sr <= r && sg <= g && sb <= b);
    }

    /// Rendering at brightness 255 reproduces the unpacked framebuffer exactly.
    #[test]
    fn full_brightness_render_matches_unpacked(raw in 0u16..=u16::MAX, x in 0i32..64, y in 0i32..64) {
        let mut display = PixelDisplay::new();
        display.set_brightness(255);
        let color = PackedColor::from_raw(raw);
        display.set_pixel(x, y, color);

        let (r, g, b) = color.to_rgb888();
        let frame = display.render();
        assert_eq!(frame.pixel(x as usize, y as usize), Some([r, g, b]));
    }
}
