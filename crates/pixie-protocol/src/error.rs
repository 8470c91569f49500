use thiserror::Error;

/// Why a binary payload could not be turned into panel pixels
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Cover payload shorter than a full 64×64 RGB565 image
    #[error("cover payload too short: {actual} bytes, need {expected}")]
    CoverTooShort {
        /// Bytes required
        expected: usize,
        /// Bytes received
        actual: usize,
    },
    /// No line feed separating the JSON header from the pixel data
    #[error("photo payload has no header delimiter in the first {scanned} bytes")]
    MissingDelimiter {
        /// Bytes searched
        scanned: usize,
    },
    /// Fewer pixel bytes after the header than a full RGB888 image
    #[error("photo pixel data too short: {actual} bytes, need {expected}")]
    PhotoTooShort {
        /// Bytes required
        expected: usize,
        /// Bytes received after the delimiter
        actual: usize,
    },
}
