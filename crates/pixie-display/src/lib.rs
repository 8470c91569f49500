//! Pixie LED Panel Model
//!
//! In-memory model of the 64×64 RGB LED matrix driven by a pixie frame.
//!
//! - Packed 5/6/5 colors with lossy 8-bit conversion
//! - Compact proportional bitmap font (Picopixel metrics)
//! - Framebuffer with clipping and embedded-graphics integration
//! - Brightness applied at render time, never stored in the framebuffer
//! - Frame sinks for presenting rendered frames (null, recording, PNG)
//!
//! # Example
//!
//! ```
//! use pixie_display::{PackedColor, PixelDisplay};
//!
//! let mut display = PixelDisplay::new();
//! display.set_brightness(128);
//! display.set_pixel(0, 0, PackedColor::RED);
//!
//! let frame = display.render();
//! assert_eq!(frame.pixel(0, 0), Some([124, 0, 0]));
//! ```

pub mod color;
mod display;
pub mod font;
mod frame;
mod framebuffer;

pub use color::PackedColor;
pub use display::{PixelDisplay, TextBounds};
pub use font::{Font, Glyph, TextMetrics};
pub use frame::{Frame, FrameSink, NullSink, RecordingSink};
pub use framebuffer::Framebuffer;

/// Panel width in pixels
pub const WIDTH: usize = 64;

/// Panel height in pixels
pub const HEIGHT: usize = 64;

/// Number of pixels on the panel
#[allow(clippy::arithmetic_side_effects)]
pub const PIXEL_COUNT: usize = WIDTH * HEIGHT;

/// Panel width as a signed drawing coordinate
#[allow(clippy::cast_possible_wrap)]
pub const WIDTH_I32: i32 = WIDTH as i32;

/// Panel height as a signed drawing coordinate
#[allow(clippy::cast_possible_wrap)]
pub const HEIGHT_I32: i32 = HEIGHT as i32;
