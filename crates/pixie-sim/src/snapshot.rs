//! PNG snapshots of presented frames

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::ImageFormat;
use pixie_display::{Frame, FrameSink};

/// Shortest time between two snapshot writes
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);

/// Writes the latest presented frame to a PNG file, at most once per interval.
///
/// The image is written next to the target and renamed over it, so readers
/// never observe a half-written file.
#[derive(Debug)]
pub struct PngSnapshotSink {
    path: PathBuf,
    scale: u32,
    min_interval: Duration,
    last_write: Option<Instant>,
    written: u64,
}

impl PngSnapshotSink {
    pub fn new(path: PathBuf, scale: u32) -> Self {
        Self::with_interval(path, scale, SNAPSHOT_INTERVAL)
    }

    pub fn with_interval(path: PathBuf, scale: u32, min_interval: Duration) -> Self {
        Self {
            path,
            scale,
            min_interval,
            last_write: None,
            written: 0,
        }
    }

    /// Snapshots written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write(&self, frame: &Frame) -> Result<()> {
        let staging = staging_path(&self.path);
        frame
            .to_image(self.scale)
            .save_with_format(&staging, ImageFormat::Png)
            .with_context(|| format!("writing {}", staging.display()))?;
        std::fs::rename(&staging, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl FrameSink for PngSnapshotSink {
    fn present(&mut self, frame: &Frame) {
        let now = Instant::now();
        if self
            .last_write
            .is_some_and(|last| now.duration_since(last) < self.min_interval)
        {
            return;
        }
        self.last_write = Some(now);

        match self.write(frame) {
            Ok(()) => {
                self.written = self.written.saturating_add(1);
                tracing::trace!(path = %self.path.display(), "snapshot written");
            }
            Err(err) => tracing::warn!(error = %format!("{err:#}"), "snapshot failed"),
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
