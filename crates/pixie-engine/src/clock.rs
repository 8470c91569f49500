//! HH:MM overlay in the top-right corner

use chrono::{DateTime, Timelike, Utc};
use pixie_display::{PackedColor, PixelDisplay, WIDTH_I32};

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Local wall-clock time as `HH:MM`, `offset_minutes` east of UTC.
/// Any offset is accepted; only its remainder modulo one day matters.
// SAFETY: both terms are below MINUTES_PER_DAY, so the sum fits easily in i32
// and the divisors are non-zero constants.
#[allow(clippy::arithmetic_side_effects)]
pub fn clock_text(now: DateTime<Utc>, offset_minutes: i32) -> String {
    let utc_minutes = (now.hour() * 60 + now.minute()) as i32;
    let local = (utc_minutes + offset_minutes.rem_euclid(MINUTES_PER_DAY)) % MINUTES_PER_DAY;
    format!("{:02}:{:02}", local / 60, local % 60)
}

/// Blank the corner and print `text` right-aligned two columns from the edge
// SAFETY: text bounds of a five-character clock string are a few pixels wide.
#[allow(clippy::arithmetic_side_effects)]
pub fn draw_clock(display: &mut PixelDisplay, text: &str) {
    display.set_font(Some("picopixel"));
    display.set_text_size(1);

    let bounds = display.text_bounds(text, 0, 0);
    let x = WIDTH_I32 - bounds.w - 2;
    let y = bounds.h + 1;

    display.fill_rect(x - 1, 0, bounds.w + 3, bounds.h + 2, PackedColor::BLACK);
    display.set_text_color(PackedColor::WHITE);
    display.set_cursor(x, y);
    display.print(text);
}

/// Draw the current time using `offset_minutes`
pub fn draw_clock_overlay(display: &mut PixelDisplay, offset_minutes: i32) {
    let text = clock_text(Utc::now(), offset_minutes);
    tracing::trace!(%text, "clock overlay");
    draw_clock(display, &text);
}
