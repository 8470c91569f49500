//! 64×64 packed-color framebuffer
//!
//! Row-major, `y * WIDTH + x`. Writes outside the panel are dropped silently.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};

use crate::color::PackedColor;
use crate::{HEIGHT, PIXEL_COUNT, WIDTH};

/// Packed-color pixel buffer covering the whole panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: Vec<PackedColor>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    /// Create a framebuffer with every pixel black
    pub fn new() -> Self {
        Self {
            pixels: vec![PackedColor::BLACK; PIXEL_COUNT],
        }
    }

    // SAFETY: both coordinates are range-checked against the panel size first,
    // so y * WIDTH + x < PIXEL_COUNT.
    #[allow(clippy::arithmetic_side_effects)]
    fn index(x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok().filter(|&x| x < WIDTH)?;
        let y = usize::try_from(y).ok().filter(|&y| y < HEIGHT)?;
        Some(y * WIDTH + x)
    }

    /// Pixel at (`x`, `y`), `None` outside the panel
    pub fn get(&self, x: i32, y: i32) -> Option<PackedColor> {
        Self::index(x, y).and_then(|idx| self.pixels.get(idx).copied())
    }

    /// Set one pixel, clipping to the panel
    pub fn set(&mut self, x: i32, y: i32, color: PackedColor) {
        if let Some(pixel) = Self::index(x, y).and_then(|idx| self.pixels.get_mut(idx)) {
            *pixel = color;
        }
    }

    /// Fill the whole buffer
    pub fn fill(&mut self, color: PackedColor) {
        self.pixels.fill(color);
    }

    /// Fill with black
    pub fn clear(&mut self) {
        self.fill(PackedColor::BLACK);
    }

    /// All pixels in row-major order
    pub fn pixels(&self) -> &[PackedColor] {
        &self.pixels
    }

    /// Mutable view of all pixels in row-major order
    pub fn pixels_mut(&mut self) -> &mut [PackedColor] {
        &mut self.pixels
    }

    /// Copy pixels from a row-major slice. Missing trailing pixels are left untouched.
    pub fn load(&mut self, source: &[PackedColor]) {
        for (dst, src) in self.pixels.iter_mut().zip(source) {
            *dst = *src;
        }
    }

    /// Copy another framebuffer wholesale
    pub fn copy_from(&mut self, other: &Framebuffer) {
        self.pixels.copy_from_slice(&other.pixels);
    }

    /// One row of pixels, `None` outside the panel
    // SAFETY: y < HEIGHT is checked, so the row range lies inside the buffer.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn row(&self, y: usize) -> Option<&[PackedColor]> {
        if y >= HEIGHT {
            return None;
        }
        self.pixels.get(y * WIDTH..(y + 1) * WIDTH)
    }

    /// Move every row up by one. The bottom row keeps its previous content.
    pub fn shift_up(&mut self) {
        self.pixels.copy_within(WIDTH.., 0);
    }

    /// Overwrite row `y` from `source` (at most `WIDTH` pixels are copied)
    // SAFETY: y < HEIGHT is checked, so the row range lies inside the buffer.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn write_row(&mut self, y: usize, source: &[PackedColor]) {
        if y >= HEIGHT {
            return;
        }
        if let Some(row) = self.pixels.get_mut(y * WIDTH..(y + 1) * WIDTH) {
            for (dst, src) in row.iter_mut().zip(source) {
                *dst = *src;
            }
        }
    }
}

impl OriginDimensions for Framebuffer {
    // SAFETY: panel dimensions are 64, well inside u32.
    #[allow(clippy::cast_possible_truncation)]
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point.x, point.y, color.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_new_is_black() {
        let fb = Framebuffer::new();
        assert_eq!(fb.pixels().len(), PIXEL_COUNT);
        assert!(fb.pixels().iter().all(|&p| p == PackedColor::BLACK));
    }

    #[test]
    fn test_set_clips_out_of_bounds() {
        let mut fb = Framebuffer::new();
        fb.set(-1, 0, PackedColor::WHITE);
        fb.set(0, -1, PackedColor::WHITE);
        fb.set(64, 0, PackedColor::WHITE);
        fb.set(0, 64, PackedColor::WHITE);
        assert!(fb.pixels().iter().all(|&p| p == PackedColor::BLACK));

        fb.set(63, 63, PackedColor::WHITE);
        assert_eq!(fb.get(63, 63), Some(PackedColor::WHITE));
        assert_eq!(fb.get(64, 63), None);
    }

    #[test]
    fn test_shift_up_moves_rows() {
        let mut fb = Framebuffer::new();
        fb.set(5, 1, PackedColor::RED);
        fb.set(7, 63, PackedColor::BLUE);
        fb.shift_up();
        assert_eq!(fb.get(5, 0), Some(PackedColor::RED));
        assert_eq!(fb.get(7, 62), Some(PackedColor::BLUE));
        // Bottom row is left as it was
        assert_eq!(fb.get(7, 63), Some(PackedColor::BLUE));
    }

    #[test]
    fn test_write_row() {
        let mut fb = Framebuffer::new();
        let row = vec![PackedColor::GREEN; WIDTH];
        fb.write_row(63, &row);
        assert_eq!(fb.row(63).unwrap(), row.as_slice());
        assert!(fb.row(64).is_none());
        fb.write_row(64, &row);
    }

    #[test]
    fn test_embedded_graphics_rectangle_is_clipped() {
        let mut fb = Framebuffer::new();
        Rectangle::new(Point::new(60, 60), Size::new(10, 10))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::RED))
            .draw(&mut fb)
            .unwrap();

        let lit = fb
            .pixels()
            .iter()
            .filter(|&&p| p == PackedColor::RED)
            .count();
        assert_eq!(lit, 16);
    }
}
