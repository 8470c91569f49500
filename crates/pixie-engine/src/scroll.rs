//! Title/author overlay with horizontal title scrolling
//!
//! # State Machine
//!
//! ```text
//! PausedStart ──2 s──> Scrolling ──fits──> PausedEnd ──2 s──> Returning ──offset 0──> PausedStart
//! ```
//!
//! Transitions:
//! - `PausedStart` → `Scrolling`: 2000 ms after the pause began
//! - `Scrolling` → `PausedEnd`: the remaining title fits in 62 columns
//! - `PausedEnd` → `Returning`: 2000 ms after the pause began
//! - `Returning` → `PausedStart`: offset is back at zero
//!
//! `Scrolling` and `Returning` move the character offset by one every 300 ms.
//! Only titles wider than 62 columns ever leave `PausedStart`.

use core::time::Duration;

use pixie_display::{PackedColor, PixelDisplay, WIDTH_I32};
use tokio::time::Instant;

/// How long the text rests at either end
pub const SCROLL_PAUSE: Duration = Duration::from_millis(2000);
/// Time per character step
pub const SCROLL_STEP: Duration = Duration::from_millis(300);

/// Widest title drawn without scrolling
const VISIBLE_WIDTH: i32 = 62;
/// Gap required between title and author on a shared row
const HORIZONTAL_MARGIN: i32 = 4;
/// Baseline of the bottom text row
const BOTTOM_BASELINE: i32 = 62;
/// Baseline of the author row when it cannot share the title's row
const UPPER_BASELINE: i32 = 52;
/// Left edge of left-aligned text
const TEXT_LEFT: i32 = 1;

/// Where the title scroller is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    /// Resting at offset 0
    #[default]
    PausedStart,
    /// Advancing the offset
    Scrolling,
    /// Resting with the title's tail visible
    PausedEnd,
    /// Walking the offset back to 0
    Returning,
}

/// Draws and scrolls the title/author overlay at the bottom of the panel
#[derive(Debug)]
pub struct ScrollController {
    title: String,
    author: String,
    state: ScrollState,
    offset: usize,
    needs_scroll: bool,
    same_line: bool,
    title_y: i32,
    author_y: i32,
    pause_start: Instant,
    last_step: Instant,
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollController {
    /// An idle controller with no text
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            title: String::new(),
            author: String::new(),
            state: ScrollState::PausedStart,
            offset: 0,
            needs_scroll: false,
            same_line: true,
            title_y: BOTTOM_BASELINE,
            author_y: BOTTOM_BASELINE,
            pause_start: now,
            last_step: now,
        }
    }

    /// Forget the current text. Nothing is drawn or erased.
    pub fn reset(&mut self) {
        self.state = ScrollState::PausedStart;
        self.offset = 0;
        self.needs_scroll = false;
        self.title.clear();
        self.author.clear();
    }

    /// Lay out and draw new text. Returns `false` when both strings are empty
    /// (nothing is drawn).
    pub fn set_info(
        &mut self,
        display: &mut PixelDisplay,
        title: &str,
        author: &str,
        now: Instant,
    ) -> bool {
        title.clone_into(&mut self.title);
        author.clone_into(&mut self.author);
        self.offset = 0;
        self.state = ScrollState::PausedStart;
        self.pause_start = now;

        if title.is_empty() && author.is_empty() {
            self.needs_scroll = false;
            return false;
        }

        let title_width = display.measure(title).width;
        let author_width = display.measure(author).width;

        self.same_line = if !title.is_empty() && !author.is_empty() {
            title_width
                .saturating_add(author_width)
                .saturating_add(HORIZONTAL_MARGIN)
                <= WIDTH_I32
        } else {
            true
        };
        self.title_y = BOTTOM_BASELINE;
        self.author_y = if self.same_line {
            BOTTOM_BASELINE
        } else {
            UPPER_BASELINE
        };
        self.needs_scroll = title_width > VISIBLE_WIDTH;

        tracing::debug!(
            title_width,
            author_width,
            same_line = self.same_line,
            needs_scroll = self.needs_scroll,
            "text overlay laid out"
        );

        self.draw(display);
        true
    }

    /// Advance the state machine. Returns `true` when the text was redrawn.
    pub fn update(&mut self, display: &mut PixelDisplay, now: Instant) -> bool {
        if !self.needs_scroll || self.title.is_empty() {
            return false;
        }

        match self.state {
            ScrollState::PausedStart => {
                if now.saturating_duration_since(self.pause_start) >= SCROLL_PAUSE {
                    self.state = ScrollState::Scrolling;
                    self.last_step = now;
                }
                false
            }
            ScrollState::Scrolling => {
                if now.saturating_duration_since(self.last_step) < SCROLL_STEP {
                    return false;
                }
                self.offset = self.offset.saturating_add(1);
                self.draw(display);
                if display.measure(self.visible_title()).width <= VISIBLE_WIDTH {
                    self.state = ScrollState::PausedEnd;
                    self.pause_start = now;
                }
                self.last_step = now;
                true
            }
            ScrollState::PausedEnd => {
                if now.saturating_duration_since(self.pause_start) >= SCROLL_PAUSE {
                    self.state = ScrollState::Returning;
                    self.last_step = now;
                }
                false
            }
            ScrollState::Returning => {
                if now.saturating_duration_since(self.last_step) < SCROLL_STEP {
                    return false;
                }
                if self.offset > 0 {
                    self.offset = self.offset.saturating_sub(1);
                    self.draw(display);
                    self.last_step = now;
                    true
                } else {
                    self.state = ScrollState::PausedStart;
                    self.pause_start = now;
                    false
                }
            }
        }
    }

    /// Current state
    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Characters scrolled off the left edge
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the title is too wide to show at once
    pub fn needs_scroll(&self) -> bool {
        self.needs_scroll
    }

    /// Whether title and author share the bottom row
    pub fn same_line(&self) -> bool {
        self.same_line
    }

    /// Current title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Current author
    pub fn author(&self) -> &str {
        &self.author
    }

    fn visible_title(&self) -> &str {
        self.title
            .char_indices()
            .nth(self.offset)
            .map_or("", |(start, _)| self.title.get(start..).unwrap_or_default())
    }

    // SAFETY: text bounds come from the panel font over a title or author of
    // a few hundred bytes at most, so every sum stays far inside i32.
    #[allow(clippy::arithmetic_side_effects)]
    fn draw(&self, display: &mut PixelDisplay) {
        display.set_font(Some("picopixel"));
        display.set_text_size(1);
        display.set_text_color(PackedColor::WHITE);

        if !self.title.is_empty() {
            let visible = self.visible_title();
            let bounds = display.text_bounds(visible, TEXT_LEFT, self.title_y);
            display.fill_rect(0, bounds.y1 - 1, WIDTH_I32, bounds.h + 2, PackedColor::BLACK);
            display.set_cursor(TEXT_LEFT, self.title_y);
            display.print(visible);
        }

        if !self.author.is_empty() && self.offset == 0 {
            if self.same_line {
                let width = display.measure(&self.author).width;
                let x = WIDTH_I32 - width;
                let bounds = display.text_bounds(&self.author, x, self.author_y);
                display.fill_rect(x - 1, bounds.y1 - 1, width + 2, bounds.h + 2, PackedColor::BLACK);
                display.set_cursor(x, self.author_y);
            } else {
                let bounds = display.text_bounds(&self.author, TEXT_LEFT, self.author_y);
                display.fill_rect(0, bounds.y1 - 1, WIDTH_I32, bounds.h + 2, PackedColor::BLACK);
                display.set_cursor(TEXT_LEFT, self.author_y);
            }
            display.print(&self.author);
        }
    }
}
