//! JSON text codec.
//!
//! A thin wrapper over `serde_json` so the rest of the engine talks to one
//! place for decoding request text and encoding response bodies.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON at line {line}, column {column}: {message}")]
    Decode {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode request text into a generic value tree.
pub fn decode(text: &str) -> Result<Value, CodecError> {
    serde_json::from_str(text).map_err(|err| CodecError::Decode {
        line: err.line(),
        column: err.column(),
        message: err.to_string(),
    })
}

pub fn encode<T>(value: &T) -> Result<String, CodecError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string(value).map_err(CodecError::Encode)
}
