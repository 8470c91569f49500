//! Device main loop
//!
//! One [`Orchestrator`] per simulated pixie. It owns the panel, the
//! configuration and every manager, and drives them from a single task:
//!
//! - a 100 ms tick runs drawing service, then either the now-playing or the
//!   carousel cycle, then the title scroller and the clock overlay, then
//!   presents a frame
//! - a 20 ms commit timer services the drawing canvas while it is active
//! - pushed commands and local [`Intent`]s are applied between ticks
//!
//! A tick holds `&mut self` for its whole duration, so an overrunning tick
//! (slow request, long animation) can never be re-entered; interval firings
//! missed meanwhile are skipped.

use core::ops::ControlFlow;
use core::time::Duration;

use pixie_display::PixelDisplay;
use pixie_protocol::{Command, CommandMessage, ConfigUpdate};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::clock::draw_clock_overlay;
use crate::config::DeviceConfig;
use crate::drawing::{DrawAction, DrawingProcessor, Transition, COMMIT_INTERVAL};
use crate::error::CycleError;
use crate::messaging::{Inbox, LinkStatus, MessagingClient};
use crate::now_playing::NowPlaying;
use crate::photo::PhotoCarousel;
use crate::scroll::ScrollController;
use crate::Stage;

/// Main tick cadence
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Which feature owns the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Photos rotate on the carousel interval
    #[default]
    Carousel,
    /// An album cover is on screen
    NowPlaying,
    /// The remote drawing canvas is active
    Drawing,
}

/// Local control requests from a presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Set the configured brightness
    SetBrightness(u8),
    /// Enable or disable now-playing covers
    SetNowPlaying(bool),
    /// Enable or disable the clock overlay
    SetClock(bool),
    /// Show the next carousel photo now
    NextPhoto,
    /// Show the previous carousel photo now
    PreviousPhoto,
    /// Leave the run loop
    Stop,
}

/// Sends [`Intent`]s to a running orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    intents: mpsc::UnboundedSender<Intent>,
}

impl OrchestratorHandle {
    /// A handle plus the receiver to pass to [`Orchestrator::run`]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Intent>) {
        let (intents, rx) = mpsc::unbounded_channel();
        (Self { intents }, rx)
    }

    /// Queue an intent. Returns `false` once the orchestrator has stopped.
    pub fn send(&self, intent: Intent) -> bool {
        self.intents.send(intent).is_ok()
    }

    /// Set the configured brightness
    pub fn set_brightness(&self, brightness: u8) -> bool {
        self.send(Intent::SetBrightness(brightness))
    }

    /// Show the next photo now
    pub fn next_photo(&self) -> bool {
        self.send(Intent::NextPhoto)
    }

    /// Show the previous photo now
    pub fn previous_photo(&self) -> bool {
        self.send(Intent::PreviousPhoto)
    }

    /// Stop the run loop after the current tick
    pub fn stop(&self) -> bool {
        self.send(Intent::Stop)
    }
}

/// When each periodic job last ran
#[derive(Debug, Default)]
struct Schedule {
    last_photo_change: Option<Instant>,
    force_photo: bool,
    last_song_check: Option<Instant>,
    last_clock_update: Option<Instant>,
}

impl Schedule {
    fn elapsed(last: Option<Instant>, now: Instant, period: Duration) -> bool {
        last.map_or(true, |t| now.saturating_duration_since(t) >= period)
    }

    fn photo_due(&self, now: Instant, period: Duration) -> bool {
        self.force_photo || Self::elapsed(self.last_photo_change, now, period)
    }

    fn photo_changed(&mut self, at: Instant) {
        self.last_photo_change = Some(at);
        self.force_photo = false;
    }
}

/// State shared by every presentation step
struct Device {
    display: PixelDisplay,
    scroll: ScrollController,
    client: MessagingClient,
    config: DeviceConfig,
}

impl Device {
    fn stage(&mut self) -> Stage<'_> {
        Stage {
            display: &mut self.display,
            scroll: &mut self.scroll,
            client: &self.client,
            config: &self.config,
        }
    }
}

/// Owns and schedules everything one pixie does
pub struct Orchestrator {
    device: Device,
    photos: PhotoCarousel,
    now_playing: NowPlaying,
    drawing: DrawingProcessor,
    schedule: Schedule,
    song_online: String,
    pending_photo: Option<u64>,
    mode: watch::Sender<DisplayMode>,
}

impl Orchestrator {
    /// Wire up a device with default configuration
    pub fn new(display: PixelDisplay, client: MessagingClient) -> Self {
        let config = DeviceConfig::default();
        let mut display = display;
        display.set_brightness(i32::from(config.display_brightness()));
        let (mode, _) = watch::channel(DisplayMode::Carousel);
        Self {
            device: Device {
                display,
                scroll: ScrollController::new(),
                client,
                config,
            },
            photos: PhotoCarousel::new(),
            now_playing: NowPlaying::new(),
            drawing: DrawingProcessor::new(),
            schedule: Schedule::default(),
            song_online: String::new(),
            pending_photo: None,
            mode,
        }
    }

    /// Current display mode
    pub fn mode(&self) -> DisplayMode {
        *self.mode.borrow()
    }

    /// Receive every display mode change
    pub fn subscribe_mode(&self) -> watch::Receiver<DisplayMode> {
        self.mode.subscribe()
    }

    /// The panel
    pub fn display(&self) -> &PixelDisplay {
        &self.device.display
    }

    /// Active configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.device.config
    }

    /// Title/author scroller
    pub fn scroll(&self) -> &ScrollController {
        &self.device.scroll
    }

    /// Drawing canvas
    pub fn drawing(&self) -> &DrawingProcessor {
        &self.drawing
    }

    /// Photo carousel
    pub fn photos(&self) -> &PhotoCarousel {
        &self.photos
    }

    /// Now-playing covers
    pub fn now_playing(&self) -> &NowPlaying {
        &self.now_playing
    }

    /// Bus client
    pub fn client(&self) -> &MessagingClient {
        &self.device.client
    }

    /// Fetch and apply the server-side configuration. Missing or unreadable
    /// responses keep the current settings.
    pub async fn request_config(&mut self) {
        tracing::info!("requesting configuration");
        let Some(body) = self.device.client.request_config().await else {
            tracing::warn!("no configuration response, keeping current settings");
            return;
        };
        match ConfigUpdate::parse(&body) {
            Ok(update) => {
                self.apply_config(&update);
                tracing::info!(config = ?self.device.config, "configuration applied");
            }
            Err(err) => tracing::warn!(%err, "unreadable configuration response"),
        }
    }

    /// Merge `update` into the configuration and push brightness to the panel
    pub fn apply_config(&mut self, update: &ConfigUpdate) {
        self.device.config.apply(update);
        self.apply_brightness();
        self.publish_mode();
    }

    /// Apply one pushed command
    pub async fn handle_command(&mut self, message: CommandMessage, now: Instant) {
        let command = match Command::decode(&message) {
            Ok(Some(command)) => command,
            Ok(None) => {
                tracing::debug!(action = %message.action, "ignoring unknown command");
                return;
            }
            Err(err) => {
                tracing::warn!(action = %message.action, %err, "malformed command");
                return;
            }
        };

        match DrawAction::try_from(command) {
            Ok(action) => {
                let transition = self.drawing.handle(action, &mut self.device.display, now);
                self.on_transition(transition);
            }
            Err(Command::UpdateInfo(update)) => {
                tracing::info!("configuration update received");
                self.apply_config(&update);
            }
            Err(Command::UpdatePhoto { id }) => {
                tracing::info!(id, "photo pushed");
                if self.drawing.is_active() {
                    tracing::debug!(id, "drawing active, deferring pushed photo");
                    self.pending_photo = Some(id);
                } else {
                    self.show_pushed(id).await;
                }
            }
            Err(other) => tracing::debug!(?other, "command has no handler"),
        }
    }

    /// One pass of the main loop. Does nothing while disconnected.
    ///
    /// The display mode is settled first (pushed photo, song poll) and then
    /// decides exclusively what runs this tick.
    pub async fn tick(&mut self, now: Instant) {
        if !self.device.client.is_connected() {
            return;
        }

        if !self.drawing.is_active() {
            if let Some(id) = self.pending_photo.take() {
                self.show_pushed(id).await;
            }
            if self.device.config.now_playing_enabled {
                self.poll_song(now).await;
            }
        }

        match self.current_mode() {
            DisplayMode::Drawing => {
                self.service_drawing(now);
                return;
            }
            DisplayMode::NowPlaying => self.cover_cycle().await,
            DisplayMode::Carousel => self.carousel_cycle(now).await,
        }

        self.device.scroll.update(&mut self.device.display, now);

        if self.device.config.clock_enabled
            && Schedule::elapsed(
                self.schedule.last_clock_update,
                now,
                self.device.config.clock_interval,
            )
        {
            draw_clock_overlay(
                &mut self.device.display,
                self.device.config.timezone_offset_minutes,
            );
            self.schedule.last_clock_update = Some(now);
        }

        self.device.display.present();
        self.publish_mode();
    }

    /// Drawing commit and idle timeout
    pub fn service_drawing(&mut self, now: Instant) {
        let transition = self.drawing.service(&mut self.device.display, now);
        self.on_transition(transition);
    }

    /// Apply a local intent. `Break` for [`Intent::Stop`].
    pub fn apply_intent(&mut self, intent: Intent) -> ControlFlow<()> {
        tracing::debug!(?intent, "intent");
        match intent {
            Intent::SetBrightness(brightness) => {
                self.device.config.brightness = brightness;
                self.apply_brightness();
            }
            Intent::SetNowPlaying(enabled) => {
                self.device.config.now_playing_enabled = enabled;
                if !enabled && self.now_playing.showing().is_some() {
                    self.now_playing.clear_song();
                    self.schedule.force_photo = true;
                }
                self.publish_mode();
            }
            Intent::SetClock(enabled) => {
                self.device.config.clock_enabled = enabled;
                if enabled && !self.drawing.is_active() {
                    draw_clock_overlay(
                        &mut self.device.display,
                        self.device.config.timezone_offset_minutes,
                    );
                    self.device.display.present();
                    self.schedule.last_clock_update = Some(Instant::now());
                }
            }
            Intent::NextPhoto => self.schedule.force_photo = true,
            Intent::PreviousPhoto => {
                self.photos.step_back();
                self.schedule.force_photo = true;
            }
            Intent::Stop => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Drive the device until [`Intent::Stop`].
    ///
    /// The configuration is requested every time the link comes up.
    pub async fn run(&mut self, inbox: Inbox, mut intents: mpsc::UnboundedReceiver<Intent>) {
        let Inbox {
            mut commands,
            mut status,
        } = inbox;

        let mut tick = interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commit = interval(COMMIT_INTERVAL);
        commit.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(pixie = self.device.client.topics().pixie_id(), "main loop started");
        if *status.borrow_and_update() == LinkStatus::Connected {
            self.request_config().await;
        }

        loop {
            tokio::select! {
                _ = tick.tick() => self.tick(Instant::now()).await,
                _ = commit.tick(), if self.drawing.is_active() => {
                    self.service_drawing(Instant::now());
                }
                Some(message) = commands.recv() => {
                    self.handle_command(message, Instant::now()).await;
                }
                Some(intent) = intents.recv() => {
                    if self.apply_intent(intent).is_break() {
                        break;
                    }
                }
                Ok(()) = status.changed() => {
                    let link = *status.borrow_and_update();
                    if link == LinkStatus::Connected {
                        self.request_config().await;
                    }
                }
            }
        }
        tracing::info!("main loop stopped");
    }

    /// Which feature owns the panel: drawing first, then a playing song
    /// when covers are enabled, otherwise the carousel
    fn current_mode(&self) -> DisplayMode {
        if self.drawing.is_active() {
            DisplayMode::Drawing
        } else if self.device.config.now_playing_enabled && !self.song_online.is_empty() {
            DisplayMode::NowPlaying
        } else {
            DisplayMode::Carousel
        }
    }

    async fn poll_song(&mut self, now: Instant) {
        let poll = self.device.config.now_playing_poll_interval;
        if !Schedule::elapsed(self.schedule.last_song_check, now, poll) || self.photos.is_busy() {
            return;
        }
        self.schedule.last_song_check = Some(now);
        self.song_online = self.now_playing.check_song(&self.device.client).await;
        if self.song_online.is_empty() {
            tracing::debug!("song check: nothing playing");
            if self.now_playing.showing().is_some() {
                self.now_playing.clear_song();
                self.schedule.force_photo = true;
            }
        } else {
            tracing::debug!(song = %self.song_online, "song check: playing");
        }
    }

    async fn cover_cycle(&mut self) {
        if self.now_playing.showing() == Some(self.song_online.as_str()) || self.photos.is_busy() {
            return;
        }
        let song = self.song_online.clone();
        let result = self.now_playing.show_cover(&song, self.device.stage()).await;
        log_cycle(result, "cover");
        self.schedule.photo_changed(Instant::now());
    }

    async fn carousel_cycle(&mut self, now: Instant) {
        if !self
            .schedule
            .photo_due(now, self.device.config.carousel_interval)
            || self.photos.is_busy()
        {
            return;
        }
        let result = self.photos.show_next(self.device.stage()).await;
        log_cycle(result, "carousel photo");
        self.schedule.photo_changed(Instant::now());
    }

    async fn show_pushed(&mut self, id: u64) {
        let result = self.photos.show_by_id(id, self.device.stage()).await;
        log_cycle(result, "pushed photo");
        self.schedule.photo_changed(Instant::now());
        self.now_playing.clear_song();
        self.publish_mode();
    }

    fn on_transition(&mut self, transition: Transition) {
        match transition {
            Transition::Unchanged => return,
            Transition::Entered => self.device.scroll.reset(),
            Transition::Exited => {
                self.now_playing.clear_song();
                self.schedule.force_photo = true;
            }
        }
        self.publish_mode();
    }

    fn apply_brightness(&mut self) {
        let brightness = self.device.config.display_brightness();
        self.device.display.set_brightness(i32::from(brightness));
        tracing::debug!(brightness, "brightness applied");
    }

    fn publish_mode(&self) {
        let mode = self.current_mode();
        self.mode.send_if_modified(|current| {
            if *current == mode {
                false
            } else {
                tracing::info!(from = ?*current, to = ?mode, "display mode changed");
                *current = mode;
                true
            }
        });
    }
}

fn log_cycle(result: Result<(), CycleError>, what: &str) {
    match result {
        Ok(()) => {}
        Err(CycleError::Busy) => tracing::debug!(what, "skipped, fetch in progress"),
        Err(err @ CycleError::NoResponse(_)) => tracing::warn!(what, %err, "skipped cycle"),
        Err(err) => tracing::warn!(what, %err, "failed to decode, skipped cycle"),
    }
}
