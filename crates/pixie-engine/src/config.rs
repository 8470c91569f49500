//! Device configuration
//!
//! Defaults match a factory-fresh frame. The server can override any subset
//! through the `config` response or the `update_info` command.

use core::time::Duration;

use pixie_protocol::ConfigUpdate;

/// Lowest brightness the panel is ever driven at
pub const MIN_BRIGHTNESS: u8 = 10;

/// Runtime configuration of one pixie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Requested brightness 0..=255 (the panel uses at least [`MIN_BRIGHTNESS`])
    pub brightness: u8,
    /// Time between carousel photos
    pub carousel_interval: Duration,
    /// Time between "what is playing" polls
    pub now_playing_poll_interval: Duration,
    /// Time between clock overlay redraws
    pub clock_interval: Duration,
    /// Draw the clock overlay
    pub clock_enabled: bool,
    /// Show album covers while music plays
    pub now_playing_enabled: bool,
    /// Minutes added to UTC for the clock overlay
    pub timezone_offset_minutes: i32,
    /// Photos the carousel cycles through before wrapping to 0
    pub max_photos: u32,
}

impl DeviceConfig {
    /// Factory defaults
    pub const DEFAULT: Self = Self {
        brightness: 50,
        carousel_interval: Duration::from_millis(30_000),
        now_playing_poll_interval: Duration::from_millis(5_000),
        clock_interval: Duration::from_millis(60_000),
        clock_enabled: false,
        now_playing_enabled: false,
        timezone_offset_minutes: 0,
        max_photos: 5,
    };

    /// Brightness actually applied to the panel
    pub fn display_brightness(&self) -> u8 {
        self.brightness.max(MIN_BRIGHTNESS)
    }

    /// Overwrite the fields present in `update`
    pub fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(brightness) = update.brightness {
            self.brightness = brightness.clamp(0, 255) as u8;
        }
        if let Some(max_photos) = update.max_photos {
            self.max_photos = max_photos;
        }
        if let Some(enabled) = update.now_playing_enabled {
            self.now_playing_enabled = enabled;
        }
        if let Some(secs) = update.secs_between_photos {
            self.carousel_interval = Duration::from_millis(secs.saturating_mul(1000));
        }
        if let Some(enabled) = update.clock_enabled {
            self.clock_enabled = enabled;
        }
        if let Some(offset) = update.timezone_offset_minutes {
            self.timezone_offset_minutes = offset;
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.brightness, 50);
        assert_eq!(config.carousel_interval, Duration::from_secs(30));
        assert_eq!(config.max_photos, 5);
        assert!(!config.clock_enabled);
        assert!(!config.now_playing_enabled);
    }

    #[test]
    fn test_apply_only_present_fields() {
        let mut config = DeviceConfig::default();
        config.apply(&ConfigUpdate {
            secs_between_photos: Some(10),
            clock_enabled: Some(true),
            ..ConfigUpdate::default()
        });
        assert_eq!(config.carousel_interval, Duration::from_millis(10_000));
        assert!(config.clock_enabled);
        assert_eq!(config.brightness, 50);
        assert_eq!(config.max_photos, 5);
    }

    #[test]
    fn test_display_brightness_floor() {
        let mut config = DeviceConfig::default();
        config.apply(&ConfigUpdate {
            brightness: Some(3),
            ..ConfigUpdate::default()
        });
        assert_eq!(config.brightness, 3);
        assert_eq!(config.display_brightness(), 10);

        config.apply(&ConfigUpdate {
            brightness: Some(900),
            ..ConfigUpdate::default()
        });
        assert_eq!(config.display_brightness(), 255);
    }
}
