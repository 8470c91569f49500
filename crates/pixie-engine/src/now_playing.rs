//! Now-playing album covers
//!
//! Polls the server for the current song and pushes its cover up from the
//! bottom edge when the song changes. Remembers which song is on screen so
//! the same cover is never fetched twice in a row.

use pixie_protocol::{decode_cover, RequestKind, SongStatus};

use crate::animation::push_up;
use crate::clock::draw_clock_overlay;
use crate::error::CycleError;
use crate::messaging::MessagingClient;
use crate::Stage;

/// Song marker and in-flight guard
#[derive(Debug, Default)]
pub struct NowPlaying {
    showing: Option<String>,
    loading: bool,
}

impl NowPlaying {
    /// Nothing shown yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a cover fetch is in flight
    pub fn is_busy(&self) -> bool {
        self.loading
    }

    /// Song whose cover is on screen
    pub fn showing(&self) -> Option<&str> {
        self.showing.as_deref()
    }

    /// Forget the song on screen so the next song triggers a fetch
    pub fn clear_song(&mut self) {
        if let Some(song) = self.showing.take() {
            tracing::debug!(%song, "song marker cleared");
        }
    }

    /// Ask which song is playing. Empty when nothing plays, the server is
    /// silent, or the answer is unreadable.
    pub async fn check_song(&self, client: &MessagingClient) -> String {
        match client.request_song().await {
            Some(body) => SongStatus::song_id(&body),
            None => String::new(),
        }
    }

    /// Fetch and push up the cover for `song_id`, then mark it as shown
    pub async fn show_cover(&mut self, song_id: &str, stage: Stage<'_>) -> Result<(), CycleError> {
        if self.loading {
            return Err(CycleError::Busy);
        }
        self.loading = true;
        let result = self.fetch_and_present(song_id, stage).await;
        self.loading = false;
        result
    }

    async fn fetch_and_present(&mut self, song_id: &str, stage: Stage<'_>) -> Result<(), CycleError> {
        tracing::debug!(%song_id, "requesting cover");
        let body = stage
            .client
            .request_cover(song_id)
            .await
            .ok_or(CycleError::NoResponse(RequestKind::Cover))?;
        let cover = decode_cover(&body).map_err(|source| CycleError::Decode {
            kind: RequestKind::Cover,
            source,
        })?;

        let Stage {
            display,
            scroll,
            config,
            ..
        } = stage;
        scroll.reset();
        push_up(display, &cover).await;
        self.showing = Some(song_id.to_owned());
        tracing::info!(%song_id, "cover shown");

        if config.clock_enabled {
            draw_clock_overlay(display, config.timezone_offset_minutes);
        }
        display.present();
        Ok(())
    }
}
