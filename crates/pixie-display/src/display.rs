//! Panel model: framebuffer, text state and brightness
//!
//! Brightness is a presentation parameter. Drawing writes full-scale colors
//! into the framebuffer; [`PixelDisplay::render`] multiplies every channel by
//! `brightness / 255` on the way out.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Size};

use crate::color::{scale_channel, PackedColor};
use crate::font::{Font, TextMetrics, MISSING_GLYPH_ADVANCE};
use crate::frame::{Frame, FrameSink, NullSink};
use crate::framebuffer::Framebuffer;
use crate::PIXEL_COUNT;

/// Brightness of a freshly created display
pub const DEFAULT_BRIGHTNESS: u8 = 50;

/// Bounding box returned by [`PixelDisplay::text_bounds`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextBounds {
    /// Left edge (the requested cursor x)
    pub x1: i32,
    /// Top edge (cursor y plus the highest glyph offset)
    pub y1: i32,
    /// Measured width
    pub w: i32,
    /// Font cap height
    pub h: i32,
}

/// The 64×64 panel as the firmware sees it
pub struct PixelDisplay {
    framebuffer: Framebuffer,
    brightness: u8,
    cursor_x: i32,
    cursor_y: i32,
    text_color: PackedColor,
    text_size: u8,
    font: Font,
    sink: Box<dyn FrameSink + Send>,
    frames_presented: u64,
}

impl Default for PixelDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PixelDisplay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PixelDisplay")
            .field("brightness", &self.brightness)
            .field("cursor", &(self.cursor_x, self.cursor_y))
            .field("text_size", &self.text_size)
            .field("font", &self.font)
            .field("frames_presented", &self.frames_presented)
            .finish_non_exhaustive()
    }
}

impl PixelDisplay {
    /// Create a black display that discards presented frames
    pub fn new() -> Self {
        Self::with_sink(Box::new(NullSink))
    }

    /// Create a black display that hands every presented frame to `sink`
    pub fn with_sink(sink: Box<dyn FrameSink + Send>) -> Self {
        Self {
            framebuffer: Framebuffer::new(),
            brightness: DEFAULT_BRIGHTNESS,
            cursor_x: 0,
            cursor_y: 0,
            text_color: PackedColor::WHITE,
            text_size: 1,
            font: Font::default(),
            sink,
            frames_presented: 0,
        }
    }

    /// Set one pixel (clipped)
    pub fn set_pixel(&mut self, x: i32, y: i32, color: PackedColor) {
        self.framebuffer.set(x, y, color);
    }

    /// Fill a rectangle, clipping each pixel. Non-positive sizes draw nothing.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: PackedColor) {
        for dy in 0..h.max(0) {
            for dx in 0..w.max(0) {
                self.framebuffer
                    .set(x.saturating_add(dx), y.saturating_add(dy), color);
            }
        }
    }

    /// Fill the whole panel
    pub fn fill_all(&mut self, color: PackedColor) {
        self.framebuffer.fill(color);
    }

    /// Fill the whole panel with black
    pub fn clear(&mut self) {
        self.framebuffer.clear();
    }

    /// Set brightness, clamped to `0..=255`
    // SAFETY: value is clamped into u8 range before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_brightness(&mut self, value: i32) {
        self.brightness = value.clamp(0, 255) as u8;
    }

    /// Current brightness
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Move the text cursor (baseline origin)
    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor_x = x;
        self.cursor_y = y;
    }

    /// Current text cursor
    pub fn cursor(&self) -> (i32, i32) {
        (self.cursor_x, self.cursor_y)
    }

    /// Color used by [`print`](Self::print)
    pub fn set_text_color(&mut self, color: PackedColor) {
        self.text_color = color;
    }

    /// Integer text scale, at least 1
    pub fn set_text_size(&mut self, size: u8) {
        self.text_size = size.max(1);
    }

    /// Select a font by name. Any name selects the built-in font.
    pub fn set_font(&mut self, name: Option<&str>) {
        self.font = Font::from_name(name);
    }

    /// Measure `text` in the current font at size 1
    pub fn measure(&self, text: &str) -> TextMetrics {
        self.font.measure(text)
    }

    /// Bounding box of `text` printed with the cursor at (`x`, `y`)
    pub fn text_bounds(&self, text: &str, x: i32, y: i32) -> TextBounds {
        let metrics = self.font.measure(text);
        TextBounds {
            x1: x,
            y1: y.saturating_add(self.font.min_y_offset(text)),
            w: metrics.width,
            h: metrics.height,
        }
    }

    /// Print `text` at the cursor and advance it.
    ///
    /// Each set glyph bit becomes a `size × size` block. Characters without a
    /// glyph advance the cursor by `2 × size` and draw nothing.
    // SAFETY: coordinates are panel-scale (tens of pixels) and text size is a
    // u8, so none of the products or sums approach i32 limits.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn print(&mut self, text: &str) {
        let size = i32::from(self.text_size);
        for ch in text.chars() {
            let Some(glyph) = self.font.glyph(ch) else {
                self.cursor_x += i32::from(MISSING_GLYPH_ADVANCE) * size;
                continue;
            };
            let origin_x = self.cursor_x + i32::from(glyph.x_offset) * size;
            let origin_y = self.cursor_y + i32::from(glyph.y_offset) * size;
            for row in 0..glyph.height {
                for col in 0..glyph.width {
                    if !glyph.is_set(col, row) {
                        continue;
                    }
                    let px = origin_x + i32::from(col) * size;
                    let py = origin_y + i32::from(row) * size;
                    if size == 1 {
                        self.framebuffer.set(px, py, self.text_color);
                    } else {
                        self.fill_rect(px, py, size, size, self.text_color);
                    }
                }
            }
            self.cursor_x += i32::from(glyph.x_advance) * size;
        }
    }

    /// Read-only framebuffer access
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Mutable framebuffer access for bulk copies and animations
    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Produce the brightness-applied RGB frame. Does not touch the framebuffer.
    pub fn render(&self) -> Frame {
        let factor = f64::from(self.brightness) / 255.0;
        let mut rgb = Vec::with_capacity(PIXEL_COUNT.saturating_mul(3));
        for pixel in self.framebuffer.pixels() {
            let (r, g, b) = pixel.to_rgb888();
            rgb.extend_from_slice(&[
                scale_channel(r, factor),
                scale_channel(g, factor),
                scale_channel(b, factor),
            ]);
        }
        Frame::from_rgb(rgb)
    }

    /// Render and hand the frame to the sink
    pub fn present(&mut self) {
        let frame = self.render();
        self.sink.present(&frame);
        self.frames_presented = self.frames_presented.saturating_add(1);
    }

    /// Number of frames handed to the sink so far
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl OriginDimensions for PixelDisplay {
    fn size(&self) -> Size {
        self.framebuffer.size()
    }
}

impl DrawTarget for PixelDisplay {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }
}
