//! Pixie Device Engine
//!
//! Everything a pixie frame does between "connected to the bus" and "pixels
//! on the panel".
//!
//! # Architecture
//!
//! ```text
//! Orchestrator (100 ms tick, command + intent dispatch, display mode)
//!         ↓
//! PhotoCarousel / NowPlaying / DrawingProcessor / ScrollController / clock
//!         ↓
//! animation (fade, push-up, center reveal)      MessagingClient (request/response)
//!         ↓                                             ↓
//! PixelDisplay (pixie-display)                  mqtt transport / MockBroker
//! ```
//!
//! # Display modes
//!
//! Exactly one mode owns the panel at a time, derived from drawing activity
//! and configuration:
//!
//! - **Drawing**: the canvas is active; nothing else touches the panel.
//! - **NowPlaying**: covers replace photos while a song is playing.
//! - **Carousel**: photos rotate on the configured interval.
//!
//! # Features
//!
//! - `mqtt` (default) - MQTT transport via rumqttc

#![warn(clippy::all)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod animation;
pub mod clock;
pub mod config;
pub mod drawing;
mod error;
pub mod messaging;
pub mod mocks;
pub mod now_playing;
pub mod orchestrator;
pub mod photo;
pub mod scroll;

pub use config::DeviceConfig;
pub use drawing::{DrawAction, DrawCommand, DrawingProcessor, Transition};
pub use error::CycleError;
pub use messaging::{Inbox, Link, LinkEvent, LinkStatus, MessagingClient, Outbound, Router};
pub use now_playing::NowPlaying;
pub use orchestrator::{DisplayMode, Intent, Orchestrator, OrchestratorHandle};
pub use photo::PhotoCarousel;
pub use scroll::{ScrollController, ScrollState};

use pixie_display::PixelDisplay;

/// Borrowed view of the shared device state a presentation step needs
///
/// Built fresh by the orchestrator for each call so managers never hold on
/// to the display or the scroll controller between ticks.
pub struct Stage<'a> {
    /// The panel
    pub display: &'a mut PixelDisplay,
    /// Title/author scroller
    pub scroll: &'a mut ScrollController,
    /// Bus client for requests
    pub client: &'a MessagingClient,
    /// Current configuration
    pub config: &'a DeviceConfig,
}
