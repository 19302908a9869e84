//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding protocol messages.
///
/// Any of these is fatal for the session that produced the bytes: a frame
/// that cannot be decoded cannot be safely echoed back in a response, so
/// decode failures surface as transport errors rather than `BadRequest`.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Underlying stream failure, including truncation mid-message.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),

    /// A length-prefixed string exceeded its cap.
    #[error("string field of {len} bytes exceeds limit of {max}")]
    StringTooLong { len: usize, max: usize },

    /// A string field did not hold valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A result byte outside the assigned range (0 is reserved-invalid).
    #[error("invalid result value {0}")]
    InvalidResult(u8),

    /// Malformed JSON in the text form.
    #[error("malformed text message: {0}")]
    Json(#[from] serde_json::Error),
}
