//! Pixie Wire Protocol
//!
//! Everything that crosses the message bus between a pixie frame and its
//! server, with no I/O attached:
//!
//! - Topic layout (`pixie/{id}`, `pixie/{id}/request/{kind}`, `pixie/{id}/response/{kind}`)
//! - JSON request bodies, configuration updates and pushed commands
//! - Binary photo and cover payload decoders (plus encoders for test fixtures)

mod codec;
mod command;
mod error;
mod message;
mod topics;

pub use codec::{
    decode_cover, decode_photo, encode_cover, PhotoFrame, PhotoMeta, COVER_PAYLOAD_LEN,
    PHOTO_HEADER_SCAN_LEN, PHOTO_PIXEL_BYTES,
};
pub use command::{Command, CommandMessage, StrokePoint, DEFAULT_BRUSH_SIZE};
pub use error::DecodeError;
pub use message::{ConfigUpdate, CoverQuery, PhotoQuery, SongStatus};
pub use topics::{RequestKind, Topics};
