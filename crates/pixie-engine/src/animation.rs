//! Multi-frame panel transitions
//!
//! Every transition mutates the framebuffer, presents, then sleeps before
//! the next frame. The sleeps are the only suspension points, so a caller
//! that holds `&mut PixelDisplay` owns the panel for the whole sequence.
//!
//! | Transition      | Frames | Delay |
//! |-----------------|--------|-------|
//! | fade out / in   | 21     | 30 ms |
//! | push up         | 64     | 15 ms |
//! | center reveal   | 5×32 squares + 64 rings | 5 ms |

use core::time::Duration;

use pixie_display::{PackedColor, PixelDisplay, HEIGHT, HEIGHT_I32, WIDTH, WIDTH_I32};
use tokio::time::sleep;

/// Number of steps between full and zero intensity (inclusive range yields 21 frames)
pub const FADE_STEPS: u32 = 20;
/// Delay between fade frames
pub const FADE_STEP_DELAY: Duration = Duration::from_millis(30);
/// Delay between push-up frames
pub const PUSH_UP_STEP_DELAY: Duration = Duration::from_millis(15);
/// Delay between center-reveal frames
pub const CENTER_REVEAL_STEP_DELAY: Duration = Duration::from_millis(5);

/// Colors swept by the center reveal, in order
pub const REVEAL_PALETTE: [PackedColor; 5] = [
    PackedColor::from_raw(0x3080),
    PackedColor::from_raw(0x56AA),
    PackedColor::from_raw(0xF6BD),
    PackedColor::from_raw(0xF680),
    PackedColor::from_raw(0xF746),
];

/// Number of rings drawn in the reveal's second phase
pub const REVEAL_RINGS: i32 = 64;

const CENTER_X: i32 = 32;
const CENTER_Y: i32 = 32;

/// Fade the current framebuffer to black
pub async fn fade_out(display: &mut PixelDisplay) {
    fade(display, |step| {
        f64::from(FADE_STEPS.saturating_sub(step)) / f64::from(FADE_STEPS)
    })
    .await;
}

/// Fade the current framebuffer in from black
pub async fn fade_in(display: &mut PixelDisplay) {
    fade(display, |step| f64::from(step) / f64::from(FADE_STEPS)).await;
}

async fn fade(display: &mut PixelDisplay, factor_at: impl Fn(u32) -> f64) {
    let snapshot = display.framebuffer().pixels().to_vec();
    for step in 0..=FADE_STEPS {
        let factor = factor_at(step);
        for (pixel, original) in display
            .framebuffer_mut()
            .pixels_mut()
            .iter_mut()
            .zip(&snapshot)
        {
            *pixel = original.scaled(factor);
        }
        display.present();
        sleep(FADE_STEP_DELAY).await;
    }
}

/// Scroll `incoming` (4096 row-major pixels) up from the bottom edge, one
/// row per frame, pushing the current content off the top.
// SAFETY: source_row < HEIGHT, so the row range stays below WIDTH * HEIGHT.
#[allow(clippy::arithmetic_side_effects)]
pub async fn push_up(display: &mut PixelDisplay, incoming: &[PackedColor]) {
    for source_row in 0..HEIGHT {
        let framebuffer = display.framebuffer_mut();
        framebuffer.shift_up();
        let start = source_row * WIDTH;
        let row = incoming.get(start..start + WIDTH).unwrap_or_default();
        framebuffer.write_row(HEIGHT - 1, row);
        display.present();
        sleep(PUSH_UP_STEP_DELAY).await;
    }
}

/// Sweep the palette as growing squares, then uncover `image` ring by ring
/// from the center outwards.
// SAFETY: sizes and radii are bounded by the panel edge (64), far inside i32.
#[allow(clippy::arithmetic_side_effects)]
pub async fn center_reveal(display: &mut PixelDisplay, image: &[PackedColor]) {
    let largest = WIDTH_I32.max(HEIGHT_I32);
    for color in REVEAL_PALETTE {
        for size in (2..=largest).step_by(2) {
            let half = size / 2;
            let edge = 2 * half + 1;
            display.fill_rect(CENTER_X - half, CENTER_Y - half, edge, edge, color);
            display.present();
            sleep(CENTER_REVEAL_STEP_DELAY).await;
        }
    }

    for radius in 0..REVEAL_RINGS {
        for y in (CENTER_Y - radius)..=(CENTER_Y + radius) {
            for x in (CENTER_X - radius)..=(CENTER_X + radius) {
                let on_ring = (x - CENTER_X).abs() == radius || (y - CENTER_Y).abs() == radius;
                if !on_ring {
                    continue;
                }
                if let Some(color) = image_pixel(image, x, y) {
                    display.set_pixel(x, y, color);
                }
            }
        }
        display.present();
        sleep(CENTER_REVEAL_STEP_DELAY).await;
    }
}

// SAFETY: x and y are range-checked first, so the index is below 4096.
#[allow(clippy::arithmetic_side_effects, clippy::cast_sign_loss)]
fn image_pixel(image: &[PackedColor], x: i32, y: i32) -> Option<PackedColor> {
    if !(0..WIDTH_I32).contains(&x) || !(0..HEIGHT_I32).contains(&y) {
        return None;
    }
    image.get((y * WIDTH_I32 + x) as usize).copied()
}
