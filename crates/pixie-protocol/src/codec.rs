//! Binary payload codecs
//!
//! # Photo (`photo` response)
//!
//! ```text
//! {"title":"...","author":"..."}\n<64*64*3 bytes R,G,B row-major>
//! ```
//!
//! The line feed must appear within the first 256 bytes. Extra bytes after
//! the pixel block are ignored.
//!
//! # Cover (`cover` response)
//!
//! 64*64 big-endian u16 values, 8192 bytes. The server packs them with the
//! panel's channel swap applied: bits 15..11 carry blue, 10..5 carry red,
//! 4..0 carry green. Decoding undoes the swap, which costs one bit of red
//! and one bit of green precision.

use pixie_display::{PackedColor, PIXEL_COUNT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Exact size of a cover payload
#[allow(clippy::arithmetic_side_effects)]
pub const COVER_PAYLOAD_LEN: usize = PIXEL_COUNT * 2;

/// Size of the RGB888 block following a photo header
#[allow(clippy::arithmetic_side_effects)]
pub const PHOTO_PIXEL_BYTES: usize = PIXEL_COUNT * 3;

/// How far into a photo payload the header delimiter may appear
pub const PHOTO_HEADER_SCAN_LEN: usize = 256;

const HEADER_DELIMITER: u8 = b'\n';

/// Photo header. Missing or unparseable fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoMeta {
    /// Photo title
    #[serde(default)]
    pub title: String,
    /// Photo author
    #[serde(default)]
    pub author: String,
}

impl PhotoMeta {
    /// Read title and author from a JSON header, each on its own: a field
    /// that is absent, null or not a string is empty without affecting the
    /// other. A header that is not JSON yields empty metadata.
    pub fn from_header(header: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<Value>(header) else {
            return Self::default();
        };
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        Self {
            title: field("title"),
            author: field("author"),
        }
    }
}

/// A decoded carousel photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFrame {
    /// Title and author shown under the photo
    pub meta: PhotoMeta,
    /// 4096 packed pixels, row-major
    pub pixels: Vec<PackedColor>,
}

impl PhotoFrame {
    /// Serialize into the `photo` response format
    #[allow(clippy::arithmetic_side_effects)]
    pub fn encode(&self) -> Vec<u8> {
        let header = serde_json::to_vec(&self.meta).unwrap_or_else(|_| b"{}".to_vec());
        let total = header.len() + 1 + PHOTO_PIXEL_BYTES;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&header);
        out.push(HEADER_DELIMITER);
        for pixel in self.pixels.iter().take(PIXEL_COUNT) {
            let (r, g, b) = pixel.to_rgb888();
            out.extend_from_slice(&[r, g, b]);
        }
        out.resize(total, 0);
        out
    }
}

/// Decode a cover payload into 4096 packed pixels
// SAFETY: bit operations on a u16 with constant masks and shifts below 16.
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
pub fn decode_cover(payload: &[u8]) -> Result<Vec<PackedColor>, DecodeError> {
    let body = payload
        .get(..COVER_PAYLOAD_LEN)
        .ok_or(DecodeError::CoverTooShort {
            expected: COVER_PAYLOAD_LEN,
            actual: payload.len(),
        })?;

    Ok(body
        .chunks_exact(2)
        .map(|pair| {
            let encoded = match pair {
                [hi, lo] => u16::from_be_bytes([*hi, *lo]),
                _ => 0,
            };
            let blue = (encoded >> 11) & 0x1F;
            let red = (encoded >> 5) & 0x3F;
            let green = encoded & 0x1F;
            PackedColor::from_rgb888((red << 2) as u8, (green << 3) as u8, (blue << 3) as u8)
        })
        .collect())
}

/// Encode packed pixels into the channel-swapped cover format.
///
/// Used by test brokers. The bottom bit of the 6-bit green channel is not
/// representable on the wire, nor is the bottom bit of the 6-bit red field
/// after decoding, so only colors without those bits survive a round trip.
// SAFETY: channel values are masked below 0x100 before shifting into a u16.
#[allow(clippy::arithmetic_side_effects)]
pub fn encode_cover(pixels: &[PackedColor]) -> Vec<u8> {
    let mut out = Vec::with_capacity(COVER_PAYLOAD_LEN);
    for pixel in pixels.iter().take(PIXEL_COUNT) {
        let (r, g, b) = pixel.to_rgb888();
        let encoded =
            ((u16::from(b) & 0xF8) << 8) | ((u16::from(r) & 0xFC) << 3) | (u16::from(g) >> 3);
        out.extend_from_slice(&encoded.to_be_bytes());
    }
    out.resize(COVER_PAYLOAD_LEN, 0);
    out
}

/// Decode a photo payload
pub fn decode_photo(payload: &[u8]) -> Result<PhotoFrame, DecodeError> {
    let scanned = payload.len().min(PHOTO_HEADER_SCAN_LEN);
    let header_end = payload
        .iter()
        .take(scanned)
        .position(|&byte| byte == HEADER_DELIMITER)
        .ok_or(DecodeError::MissingDelimiter { scanned })?;

    let (header, rest) = payload.split_at(header_end);
    let body = rest.get(1..).unwrap_or_default();
    let rgb = body
        .get(..PHOTO_PIXEL_BYTES)
        .ok_or(DecodeError::PhotoTooShort {
            expected: PHOTO_PIXEL_BYTES,
            actual: body.len(),
        })?;

    let meta = PhotoMeta::from_header(header);
    let pixels = rgb
        .chunks_exact(3)
        .map(|triple| match triple {
            [r, g, b] => PackedColor::from_rgb888(*r, *g, *b),
            _ => PackedColor::BLACK,
        })
        .collect();

    Ok(PhotoFrame { meta, pixels })
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_too_short() {
        let err = decode_cover(&[0u8; 8191]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::CoverTooShort {
                expected: 8192,
                actual: 8191
            }
        );
    }

    #[test]
    fn test_cover_all_zero_is_black() {
        let pixels = decode_cover(&[0u8; 8192]).unwrap();
        assert_eq!(pixels.len(), 4096);
        assert!(pixels.iter().all(|&p| p == PackedColor::BLACK));
    }

    #[test]
    fn test_cover_undoes_channel_swap() {
        // Top five bits carry blue on the wire
        let mut payload = vec![0u8; 8192];
        payload[0] = 0xF8;
        payload[1] = 0x00;
        let pixels = decode_cover(&payload).unwrap();
        assert_eq!(pixels[0], PackedColor::BLUE);
    }

    #[test]
    fn test_cover_encode_decode_primaries() {
        let source = vec![PackedColor::RED, PackedColor::BLUE, PackedColor::BLACK];
        let decoded = decode_cover(&encode_cover(&source)).unwrap();
        assert_eq!(&decoded[..3], source.as_slice());
        assert!(decoded[3..].iter().all(|&p| p == PackedColor::BLACK));
    }

    #[test]
    fn test_photo_without_delimiter() {
        let payload = vec![b'x'; 300];
        assert_eq!(
            decode_photo(&payload).unwrap_err(),
            DecodeError::MissingDelimiter { scanned: 256 }
        );
    }

    #[test]
    fn test_photo_delimiter_past_scan_window() {
        let mut payload = vec![b' '; 257];
        payload.push(b'\n');
        payload.extend(vec![0u8; PHOTO_PIXEL_BYTES]);
        assert!(matches!(
            decode_photo(&payload),
            Err(DecodeError::MissingDelimiter { .. })
        ));
    }

    #[test]
    fn test_photo_short_pixel_block() {
        // Delimiter at byte 10, then only 12000 pixel bytes
        let mut payload = b"0123456789\n".to_vec();
        payload.extend(vec![0u8; 12000]);
        assert_eq!(
            decode_photo(&payload).unwrap_err(),
            DecodeError::PhotoTooShort {
                expected: 12288,
                actual: 12000
            }
        );
    }

    #[test]
    fn test_photo_bad_header_keeps_pixels() {
        let mut payload = b"not json\n".to_vec();
        payload.extend([255u8, 0, 0].repeat(PIXEL_COUNT));
        let photo = decode_photo(&payload).unwrap();
        assert_eq!(photo.meta, PhotoMeta::default());
        assert!(photo.pixels.iter().all(|&p| p == PackedColor::RED));
    }

    #[test]
    fn test_photo_header_fields_independent() {
        assert_eq!(
            PhotoMeta::from_header(br#"{"title":null,"author":"A.K."}"#),
            PhotoMeta {
                title: String::new(),
                author: "A.K.".into(),
            }
        );
        assert_eq!(
            PhotoMeta::from_header(br#"{"title":"Dawn","author":42}"#),
            PhotoMeta {
                title: "Dawn".into(),
                author: String::new(),
            }
        );
        assert_eq!(PhotoMeta::from_header(b"[1,2]"), PhotoMeta::default());
    }

    #[test]
    fn test_photo_null_title_keeps_author() {
        let mut payload = br#"{"title":null,"author":"A.K."}"#.to_vec();
        payload.push(b'\n');
        payload.extend(vec![0u8; PHOTO_PIXEL_BYTES]);
        let photo = decode_photo(&payload).unwrap();
        assert_eq!(photo.meta.title, "");
        assert_eq!(photo.meta.author, "A.K.");
    }

    #[test]
    fn test_photo_encode_decode() {
        let frame = PhotoFrame {
            meta: PhotoMeta {
                title: "Dawn".into(),
                author: "A.K.".into(),
            },
            pixels: vec![PackedColor::from_raw(0x1234); PIXEL_COUNT],
        };
        assert_eq!(decode_photo(&frame.encode()).unwrap(), frame);
    }
}
