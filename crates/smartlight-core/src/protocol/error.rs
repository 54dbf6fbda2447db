//! Errors raised while decoding bytes or JSON received from a device.

use thiserror::Error;

/// Errors that can occur during cipher decoding or envelope handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The deciphered bytes are not valid UTF-8 text.
    #[error("decoded payload is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// A framed message is shorter than its 4-byte length header.
    #[error("truncated frame: need at least {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// The JSON does not have the expected two single-key levels.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A required field is absent or has the wrong type.
    #[error("missing or invalid field `{0}`")]
    MissingField(&'static str),

    /// The decoded text is not valid JSON, or a value could not be serialized.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
