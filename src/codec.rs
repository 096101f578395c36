//! Wire codecs for API messages.
//!
//! The codec is injected into [`ApiServer`](crate::servers::ApiServer) at construction;
//! there is no process-wide codec. [`JsonCodec`] is the reference implementation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Failure to move a message across the wire.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{codec} decode failed: {message}")]
    Decode { codec: &'static str, message: String },
    #[error("{codec} encode failed: {message}")]
    Encode { codec: &'static str, message: String },
}

/// Encodes and decodes typed messages.
///
/// Implementations must be total over their input: malformed bytes produce a
/// [`CodecError`], never a panic.
pub trait MessageCodec: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Content type of encoded payloads.
    fn content_type(&self) -> &'static str;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            codec: self.name(),
            message: e.to_string(),
        })
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            codec: self.name(),
            message: e.to_string(),
        })
    }
}
