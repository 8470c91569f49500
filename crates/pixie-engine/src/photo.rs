//! Photo carousel
//!
//! Fetches photos by carousel index (fade transition) or by server id
//! (center-reveal transition), then lays out the title/author overlay and
//! the optional clock. One fetch at a time: while a fetch is in flight every
//! other call fails fast with [`CycleError::Busy`].

use pixie_protocol::{decode_photo, PhotoFrame, PhotoQuery, RequestKind};
use tokio::time::Instant;

use crate::animation::{center_reveal, fade_in, fade_out};
use crate::clock::draw_clock_overlay;
use crate::error::CycleError;
use crate::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reveal {
    Fade,
    FromCenter,
}

/// Carousel position and in-flight guard
#[derive(Debug, Default)]
pub struct PhotoCarousel {
    index: u32,
    loading: bool,
}

impl PhotoCarousel {
    /// Start at index 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fetch is in flight
    pub fn is_busy(&self) -> bool {
        self.loading
    }

    /// Index the next [`show_next`](Self::show_next) will request
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Move back so the next advance shows the photo before the current one
    pub fn step_back(&mut self) {
        self.index = self.index.saturating_sub(2);
    }

    /// Show the photo at the current index, wrapping to 0 at the configured
    /// maximum, and advance on success.
    pub async fn show_next(&mut self, stage: Stage<'_>) -> Result<(), CycleError> {
        if self.index >= stage.config.max_photos {
            self.index = 0;
        }
        let index = self.index;
        self.show_index(index, stage).await?;
        self.index = index.saturating_add(1);
        Ok(())
    }

    /// Fetch the photo at `index` and fade it in
    pub async fn show_index(&mut self, index: u32, stage: Stage<'_>) -> Result<(), CycleError> {
        self.show(PhotoQuery::Index(index), Reveal::Fade, stage).await
    }

    /// Fetch the photo with server id `id` and reveal it from the center
    pub async fn show_by_id(&mut self, id: u64, stage: Stage<'_>) -> Result<(), CycleError> {
        self.show(PhotoQuery::Id(id), Reveal::FromCenter, stage).await
    }

    async fn show(
        &mut self,
        query: PhotoQuery,
        reveal: Reveal,
        stage: Stage<'_>,
    ) -> Result<(), CycleError> {
        if self.loading {
            return Err(CycleError::Busy);
        }
        self.loading = true;
        let result = fetch_and_present(query, reveal, stage).await;
        self.loading = false;
        result
    }
}

async fn fetch_and_present(
    query: PhotoQuery,
    reveal: Reveal,
    stage: Stage<'_>,
) -> Result<(), CycleError> {
    tracing::debug!(?query, "requesting photo");
    let body = stage
        .client
        .request_photo(query)
        .await
        .ok_or(CycleError::NoResponse(RequestKind::Photo))?;
    let photo = decode_photo(&body).map_err(|source| CycleError::Decode {
        kind: RequestKind::Photo,
        source,
    })?;
    tracing::info!(
        ?query,
        title = %photo.meta.title,
        author = %photo.meta.author,
        "photo received"
    );
    present(&photo, reveal, stage).await;
    Ok(())
}

async fn present(photo: &PhotoFrame, reveal: Reveal, stage: Stage<'_>) {
    let Stage {
        display,
        scroll,
        config,
        ..
    } = stage;

    match reveal {
        Reveal::Fade => {
            fade_out(display).await;
            display.clear();
            scroll.reset();
            display.framebuffer_mut().load(&photo.pixels);
            fade_in(display).await;
        }
        Reveal::FromCenter => center_reveal(display, &photo.pixels).await,
    }

    scroll.set_info(display, &photo.meta.title, &photo.meta.author, Instant::now());
    if config.clock_enabled {
        draw_clock_overlay(display, config.timezone_offset_minutes);
    }
    display.present();
}
