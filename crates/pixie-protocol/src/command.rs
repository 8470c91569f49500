//! Commands pushed by the server on `pixie/{id}`

use serde::Deserialize;
use serde_json::Value;

use crate::message::ConfigUpdate;

/// Brush size used when a `draw_pixel` command omits `size` or sends 0
pub const DEFAULT_BRUSH_SIZE: u32 = 1;

/// A raw command document: its `action` plus the whole JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMessage {
    /// The `action` field
    pub action: String,
    /// The complete document, `action` included
    pub data: Value,
}

impl CommandMessage {
    /// Parse a command payload. Non-JSON payloads and documents without a
    /// string `action` are not commands.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let data: Value = serde_json::from_slice(payload).ok()?;
        let action = data.get("action")?.as_str()?.to_owned();
        Some(Self { action, data })
    }
}

/// One point of a `draw_stroke`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StrokePoint {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

/// Typed view of the actions the device understands
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Partial configuration update
    UpdateInfo(ConfigUpdate),
    /// Show a specific photo right away
    UpdatePhoto {
        /// Server-side photo id
        id: u64,
    },
    /// Switch to the drawing canvas
    EnterDrawMode,
    /// Leave the drawing canvas
    ExitDrawMode,
    /// Queue a square brush stamp
    DrawPixel {
        /// Brush center column
        x: i32,
        /// Brush center row
        y: i32,
        /// `#RRGGBB`
        #[serde(default)]
        color: String,
        /// Brush edge length; 0 or absent means 1
        #[serde(default)]
        size: u32,
    },
    /// Paint single pixels along a path
    DrawStroke {
        /// Points to paint
        #[serde(default)]
        points: Vec<StrokePoint>,
        /// `#RRGGBB`
        #[serde(default)]
        color: String,
    },
    /// Wipe the canvas
    ClearCanvas,
}

const KNOWN_ACTIONS: [&str; 7] = [
    "update_info",
    "update_photo",
    "enter_draw_mode",
    "exit_draw_mode",
    "draw_pixel",
    "draw_stroke",
    "clear_canvas",
];

impl Command {
    /// Decode a command message.
    ///
    /// `Ok(None)` for actions this device does not know, `Err` when a known
    /// action carries malformed fields.
    pub fn decode(message: &CommandMessage) -> serde_json::Result<Option<Self>> {
        if !KNOWN_ACTIONS.contains(&message.action.as_str()) {
            return Ok(None);
        }
        Command::deserialize(&message.data).map(Some)
    }

    /// Whether this command belongs to the drawing canvas
    pub fn is_drawing(&self) -> bool {
        matches!(
            self,
            Command::EnterDrawMode
                | Command::ExitDrawMode
                | Command::DrawPixel { .. }
                | Command::DrawStroke { .. }
                | Command::ClearCanvas
        )
    }
}
