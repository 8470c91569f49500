use pixie_protocol::{DecodeError, RequestKind};
use thiserror::Error;

/// Why a photo or cover could not be shown
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// Another fetch from the same manager is still in flight
    #[error("a fetch is already in progress")]
    Busy,
    /// Not connected, timed out, or the link dropped while waiting
    #[error("no response to {0} request")]
    NoResponse(RequestKind),
    /// The server answered with bytes that are not a valid payload
    #[error("invalid {kind} payload: {source}")]
    Decode {
        /// Which response failed to decode
        kind: RequestKind,
        /// Decoder error
        #[source]
        source: DecodeError,
    },
}
