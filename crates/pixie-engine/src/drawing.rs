//! Remote drawing canvas
//!
//! # State Machine
//!
//! ```text
//! Inactive ──enter / any draw command──> Active ──exit / 60 s idle──> Inactive
//! ```
//!
//! While active, single-pixel commands queue up (at most 100, extras are
//! dropped) and are committed no more often than every 20 ms: each queued
//! brush is stamped into a shadow buffer, then the shadow buffer replaces the
//! framebuffer and the panel is presented once. Strokes skip the queue and
//! land on the panel immediately.

use core::time::Duration;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::{Point, Primitive, Size};
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::Drawable;
use heapless::Deque;
use pixie_display::{Framebuffer, PackedColor, PixelDisplay, HEIGHT_I32, WIDTH_I32};
use pixie_protocol::{Command, StrokePoint, DEFAULT_BRUSH_SIZE};
use tokio::time::Instant;

/// Minimum time between commits
pub const COMMIT_INTERVAL: Duration = Duration::from_millis(20);
/// Inactivity after which drawing mode exits on its own
pub const IDLE_TIMEOUT: Duration = Duration::from_millis(60_000);
/// Queued brush stamps kept between commits
pub const QUEUE_CAPACITY: usize = 100;
/// Largest brush edge (twice the panel width). Anything wider already covers
/// the panel from any on-panel center.
pub const MAX_BRUSH_SIZE: u32 = 128;

/// A queued brush stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    /// Brush center column
    pub x: i32,
    /// Brush center row
    pub y: i32,
    /// Fill color
    pub color: PackedColor,
    /// Brush edge length (at least 1)
    pub size: u32,
}

/// Drawing-canvas operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawAction {
    /// Enter drawing mode
    Enter,
    /// Leave drawing mode
    Exit,
    /// Queue one brush stamp
    Pixel(DrawCommand),
    /// Paint single pixels right away
    Stroke {
        /// Points to paint
        points: Vec<StrokePoint>,
        /// Color for every point
        color: PackedColor,
    },
    /// Wipe queue, shadow buffer and panel
    Clear,
}

impl TryFrom<Command> for DrawAction {
    type Error = Command;

    fn try_from(command: Command) -> Result<Self, Self::Error> {
        let color_of = |hex: &str| PackedColor::from_hex(hex).unwrap_or(PackedColor::BLACK);
        match command {
            Command::EnterDrawMode => Ok(DrawAction::Enter),
            Command::ExitDrawMode => Ok(DrawAction::Exit),
            Command::DrawPixel { x, y, color, size } => Ok(DrawAction::Pixel(DrawCommand {
                x,
                y,
                color: color_of(&color),
                size: if size == 0 { DEFAULT_BRUSH_SIZE } else { size },
            })),
            Command::DrawStroke { points, color } => Ok(DrawAction::Stroke {
                points,
                color: color_of(&color),
            }),
            Command::ClearCanvas => Ok(DrawAction::Clear),
            other => Err(other),
        }
    }
}

/// Mode change caused by a drawing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Drawing mode did not change
    Unchanged,
    /// Drawing mode became active
    Entered,
    /// Drawing mode ended
    Exited,
}

/// Owns the drawing queue and shadow buffer
#[derive(Debug)]
pub struct DrawingProcessor {
    active: bool,
    shadow: Framebuffer,
    queue: Deque<DrawCommand, QUEUE_CAPACITY>,
    last_activity: Instant,
    last_commit: Option<Instant>,
    dropped: u64,
}

impl Default for DrawingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingProcessor {
    /// An inactive canvas
    pub fn new() -> Self {
        Self {
            active: false,
            shadow: Framebuffer::new(),
            queue: Deque::new(),
            last_activity: Instant::now(),
            last_commit: None,
            dropped: 0,
        }
    }

    /// Whether drawing mode owns the panel
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stamps waiting for the next commit
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Stamps discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Apply one operation
    pub fn handle(
        &mut self,
        action: DrawAction,
        display: &mut PixelDisplay,
        now: Instant,
    ) -> Transition {
        match action {
            DrawAction::Enter => self.enter(display, now),
            DrawAction::Exit => self.exit(display),
            DrawAction::Pixel(command) => {
                let transition = self.ensure_active(display, now);
                if self.queue.push_back(command).is_err() {
                    self.dropped = self.dropped.saturating_add(1);
                    tracing::trace!(x = command.x, y = command.y, "draw queue full, dropping");
                }
                self.last_activity = now;
                transition
            }
            DrawAction::Stroke { points, color } => {
                let transition = self.ensure_active(display, now);
                for point in &points {
                    self.shadow.set(point.x, point.y, color);
                }
                display.framebuffer_mut().copy_from(&self.shadow);
                display.present();
                self.last_activity = now;
                transition
            }
            DrawAction::Clear => {
                let transition = self.ensure_active(display, now);
                self.queue.clear();
                self.shadow.clear();
                display.clear();
                display.present();
                self.last_activity = now;
                transition
            }
        }
    }

    /// Periodic servicing: idle timeout, then at most one commit per interval
    pub fn service(&mut self, display: &mut PixelDisplay, now: Instant) -> Transition {
        if !self.active {
            return Transition::Unchanged;
        }
        if now.saturating_duration_since(self.last_activity) > IDLE_TIMEOUT {
            tracing::info!("drawing idle, leaving drawing mode");
            return self.exit(display);
        }
        if self
            .last_commit
            .is_some_and(|last| now.saturating_duration_since(last) < COMMIT_INTERVAL)
        {
            return Transition::Unchanged;
        }

        if !self.queue.is_empty() {
            let mut stamped = 0usize;
            while let Some(command) = self.queue.pop_front() {
                self.stamp(command);
                stamped = stamped.saturating_add(1);
            }
            display.framebuffer_mut().copy_from(&self.shadow);
            display.present();
            tracing::trace!(stamped, "drawing committed");
        }
        self.last_commit = Some(now);
        Transition::Unchanged
    }

    fn ensure_active(&mut self, display: &mut PixelDisplay, now: Instant) -> Transition {
        if self.active {
            Transition::Unchanged
        } else {
            self.enter(display, now)
        }
    }

    fn enter(&mut self, display: &mut PixelDisplay, now: Instant) -> Transition {
        let was_active = self.active;
        self.active = true;
        self.last_activity = now;
        self.shadow.clear();
        self.queue.clear();
        display.clear();
        display.present();
        tracing::info!("drawing mode entered");
        if was_active {
            Transition::Unchanged
        } else {
            Transition::Entered
        }
    }

    fn exit(&mut self, display: &mut PixelDisplay) -> Transition {
        let was_active = self.active;
        self.active = false;
        self.queue.clear();
        display.clear();
        display.present();
        if was_active {
            tracing::info!("drawing mode exited");
            Transition::Exited
        } else {
            Transition::Unchanged
        }
    }

    /// Paint a square brush centered on the command's coordinate. Even sizes
    /// extend one pixel further right and down.
    fn stamp(&mut self, command: DrawCommand) {
        let Some(area) = brush_area(command.x, command.y, command.size) else {
            return;
        };
        let style = PrimitiveStyle::with_fill(Rgb565::from(command.color));
        // Infallible draw target
        let _ = area.into_styled(style).draw(&mut self.shadow);
    }
}

/// The brush square clipped to the panel, `None` when none of it lands on
/// the panel. Coordinates come off the bus unchecked.
// SAFETY: the brush edge is clamped to MAX_BRUSH_SIZE and the corners are
// computed in i64 from i32 inputs, so nothing overflows; the clipped corners
// lie within the panel before narrowing back to i32/u32.
#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn brush_area(x: i32, y: i32, size: u32) -> Option<Rectangle> {
    let size = i64::from(size.clamp(1, MAX_BRUSH_SIZE));
    let half = (size - 1) / 2;
    let left = (i64::from(x) - half).clamp(0, i64::from(WIDTH_I32));
    let top = (i64::from(y) - half).clamp(0, i64::from(HEIGHT_I32));
    let right = (i64::from(x) - half + size).clamp(0, i64::from(WIDTH_I32));
    let bottom = (i64::from(y) - half + size).clamp(0, i64::from(HEIGHT_I32));
    if left >= right || top >= bottom {
        return None;
    }
    Some(Rectangle::new(
        Point::new(left as i32, top as i32),
        Size::new((right - left) as u32, (bottom - top) as u32),
    ))
}
