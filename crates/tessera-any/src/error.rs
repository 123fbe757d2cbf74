//! Error types for the envelope codec.

use thiserror::Error;

/// Errors raised while encoding or decoding envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Malformed payload for {type_url}: {reason}")]
    MalformedPayload { type_url: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for CodecError {
    fn from(err: bincode::Error) -> Self {
        CodecError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
