//! Stream Codec
//!
//! Splits one WebSocket text payload into individual frames. The
//! upstream delivers a JSON array per network packet; a bare object is
//! tolerated for control messages. Frames are kept as raw JSON values;
//! typing happens downstream in the session dispatch.

use serde_json::Value;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is neither a JSON array nor an object.
    #[error("invalid payload format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the upstream feed.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text payload into its individual frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid JSON, or is valid
    /// JSON but neither an array nor an object.
    pub fn decode(&self, text: &str) -> Result<Vec<Value>, CodecError> {
        let trimmed = text.trim();

        if trimmed.starts_with('[') {
            Ok(serde_json::from_str(trimmed)?)
        } else if trimmed.starts_with('{') {
            let value: Value = serde_json::from_str(trimmed)?;
            Ok(vec![value])
        } else {
            // Truncate on char boundaries; the payload is untrusted
            // and may contain multi-byte UTF-8.
            let preview: String = trimmed.chars().take(50).collect();
            Err(CodecError::InvalidFormat(format!(
                "expected JSON array or object, got: {preview}..."
            )))
        }
    }
}
