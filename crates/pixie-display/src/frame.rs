//! Rendered frames and where they go
//!
//! A [`Frame`] is the panel as the viewer would see it: 8-bit RGB with
//! brightness already applied. [`FrameSink`] implementations decide what
//! happens to it (nothing, counting for tests, writing PNG snapshots, ...).

use std::sync::{Arc, Mutex, PoisonError};

use image::{Rgb, RgbImage};

use crate::{HEIGHT, WIDTH};

/// Brightness-applied RGB888 frame, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    rgb: Vec<u8>,
}

impl Frame {
    pub(crate) fn from_rgb(rgb: Vec<u8>) -> Self {
        Self { rgb }
    }

    /// RGB triple at (`x`, `y`), `None` outside the panel
    // SAFETY: x and y are range-checked, so the byte offset stays inside the frame.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        let offset = (y * WIDTH + x) * 3;
        match self.rgb.get(offset..offset + 3)? {
            [r, g, b] => Some([*r, *g, *b]),
            _ => None,
        }
    }

    /// Raw RGB bytes, 3 per pixel
    pub fn as_bytes(&self) -> &[u8] {
        &self.rgb
    }

    /// Upscale into an image with each panel pixel drawn as a `scale × scale` block
    // SAFETY: scale is clamped to 1..=32, so the image stays under 2048×2048
    // and every division is by a non-zero scale.
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
    pub fn to_image(&self, scale: u32) -> RgbImage {
        let scale = scale.clamp(1, 32);
        let width = WIDTH as u32 * scale;
        let height = HEIGHT as u32 * scale;
        RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b] = self
                .pixel((x / scale) as usize, (y / scale) as usize)
                .unwrap_or([0, 0, 0]);
            Rgb([r, g, b])
        })
    }
}

/// Destination for presented frames
pub trait FrameSink {
    /// Receive one presented frame
    fn present(&mut self, frame: &Frame);
}

/// Discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &Frame) {}
}

#[derive(Debug, Default)]
struct Recorded {
    count: u64,
    last: Option<Frame>,
}

/// Counts frames and keeps the most recent one. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames presented so far
    pub fn frame_count(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }

    /// Copy of the most recently presented frame
    pub fn last_frame(&self) -> Option<Frame> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last
            .clone()
    }
}

impl FrameSink for RecordingSink {
    fn present(&mut self, frame: &Frame) {
        let mut recorded = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        recorded.count = recorded.count.saturating_add(1);
        recorded.last = Some(frame.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PackedColor, PixelDisplay};

    #[test]
    fn test_to_image_scales_pixels() {
        let mut display = PixelDisplay::new();
        display.set_brightness(255);
        display.set_pixel(1, 0, PackedColor::GREEN);
        let image = display.render().to_image(4);

        assert_eq!(image.dimensions(), (256, 256));
        assert_eq!(image.get_pixel(4, 0), &Rgb([0, 252, 0]));
        assert_eq!(image.get_pixel(7, 3), &Rgb([0, 252, 0]));
        assert_eq!(image.get_pixel(8, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_pixel_out_of_range() {
        let frame = PixelDisplay::new().render();
        assert_eq!(frame.pixel(64, 0), None);
        assert_eq!(frame.pixel(0, 64), None);
        assert_eq!(frame.as_bytes().len(), 64 * 64 * 3);
    }
}
