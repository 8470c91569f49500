//! JSON request bodies and response documents

use serde::{Deserialize, Serialize};

/// Partial configuration: every field is optional and only present keys apply.
///
/// Arrives both as the `config` response and as the `update_info` command.
/// Keys are read one at a time: a value of the wrong type is dropped on its
/// own, numbers are truncated toward zero and saturated into the field's range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// Panel brightness 0..=255
    #[serde(
        default,
        deserialize_with = "lenient::signed",
        skip_serializing_if = "Option::is_none"
    )]
    pub brightness: Option<i32>,
    /// Number of photos the carousel cycles through
    #[serde(
        default,
        rename = "pictures_on_queue",
        deserialize_with = "lenient::unsigned",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_photos: Option<u32>,
    /// Enable the now-playing cover mode
    #[serde(
        default,
        rename = "spotify_enabled",
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub now_playing_enabled: Option<bool>,
    /// Seconds between carousel photos
    #[serde(
        default,
        rename = "secs_between_photos",
        deserialize_with = "lenient::unsigned_wide",
        skip_serializing_if = "Option::is_none"
    )]
    pub secs_between_photos: Option<u64>,
    /// Draw the clock overlay
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub clock_enabled: Option<bool>,
    /// Minutes added to UTC for the clock overlay
    #[serde(
        default,
        rename = "timezone_offset",
        deserialize_with = "lenient::signed",
        skip_serializing_if = "Option::is_none"
    )]
    pub timezone_offset_minutes: Option<i32>,
}

/// Field readers for [`ConfigUpdate`] that turn a mistyped value into `None`
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    // SAFETY: `as` from f64 truncates toward zero and saturates at the i64 bounds.
    #[allow(clippy::cast_possible_truncation)]
    fn integer(value: &Value) -> Option<i64> {
        let Value::Number(number) = value else {
            return None;
        };
        number
            .as_i64()
            .or_else(|| number.as_u64().map(|_| i64::MAX))
            .or_else(|| number.as_f64().map(|float| float as i64))
    }

    fn integer_in<'de, D: Deserializer<'de>>(
        deserializer: D,
        min: i64,
        max: i64,
    ) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(integer(&value).map(|n| n.clamp(min, max)))
    }

    pub(super) fn signed<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i32>, D::Error> {
        let n = integer_in(deserializer, i32::MIN.into(), i32::MAX.into())?;
        Ok(n.and_then(|n| i32::try_from(n).ok()))
    }

    pub(super) fn unsigned<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u32>, D::Error> {
        let n = integer_in(deserializer, 0, u32::MAX.into())?;
        Ok(n.and_then(|n| u32::try_from(n).ok()))
    }

    pub(super) fn unsigned_wide<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        let n = integer_in(deserializer, 0, i64::MAX)?;
        Ok(n.and_then(|n| u64::try_from(n).ok()))
    }

    pub(super) fn flag<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        Ok(Value::deserialize(deserializer)?.as_bool())
    }
}

impl ConfigUpdate {
    /// Parse a `config` response body
    pub fn parse(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

/// Body of the `song` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongStatus {
    /// Song id, absent or null when nothing is playing
    #[serde(default)]
    pub id: Option<String>,
}

impl SongStatus {
    /// Song id from a `song` response. Anything unparseable means "no song" (empty).
    pub fn song_id(payload: &[u8]) -> String {
        serde_json::from_slice::<SongStatus>(payload)
            .ok()
            .and_then(|status| status.id)
            .unwrap_or_default()
    }
}

/// Body of a `photo` request: `{"index": n}` or `{"id": n}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoQuery {
    /// Position in the carousel
    Index(u32),
    /// Server-side photo id
    Id(u64),
}

/// Body of a `cover` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverQuery {
    /// Song whose cover is wanted
    #[serde(rename = "songId")]
    pub song_id: String,
}
