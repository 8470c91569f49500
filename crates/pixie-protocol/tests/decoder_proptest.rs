//! Property-based tests for the binary payload decoders.
//! Arbitrary server bytes must never panic the device.

use pixie_protocol::{decode_cover, decode_photo, COVER_PAYLOAD_LEN, PHOTO_PIXEL_BYTES};

proptest::proptest! {
    /// decode_cover accepts exactly the payloads with at least 8192 bytes.
    #[test]
    fn cover_length_gate(payload in proptest::collection::vec(proptest::num::u8::ANY, 0..9000)) {
        let result = decode_cover(&payload);
        assert_eq!(result.is_ok(), payload.len() >= COVER_PAYLOAD_LEN);
        if let Ok(pixels) = result {
            assert_eq!(pixels.len(), 4096);
        }
    }

    /// decode_photo never panics and always yields 4096 pixels on success.
    #[test]
    fn photo_never_panics(payload in proptest::collection::vec(proptest::num::u8::ANY, 0..600)) {
        assert!(decode_photo(&payload).is_err());
    }

    /// Any header without a line feed, followed by a line feed and a full
    /// pixel block, decodes.
    #[test]
    fn photo_accepts_any_header(header in "[^\n]{0,200}", fill in proptest::num::u8::ANY) {
        let mut payload = header.into_bytes();
        if payload.len() < 256 {
            payload.push(b'\n');
            payload.extend(std::iter::repeat(fill).take(PHOTO_PIXEL_BYTES));
            let photo = decode_photo(&payload).unwrap();
            assert_eq!(photo.pixels.len(), 4096);
        }
    }
}
