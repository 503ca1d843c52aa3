//! Error types for the codec module.

use thiserror::Error;

use crate::media::TrackKind;

/// Errors reported by decoders, encoders and the codec factory.
#[derive(Debug, Error)]
pub enum CodecError {
    /// No codec implementation is available for the requested codec string.
    #[error("Unsupported {kind} codec: {codec}")]
    Unsupported { kind: TrackKind, codec: String },

    /// The codec rejected its configuration.
    #[error("Failed to configure {kind} codec: {reason}")]
    ConfigureFailed { kind: TrackKind, reason: String },

    /// Decoding a sample failed.
    #[error("Decode failed: {reason}")]
    DecodeFailed { reason: String },

    /// Encoding a frame failed.
    #[error("Encode failed: {reason}")]
    EncodeFailed { reason: String },

    /// Draining buffered output failed.
    #[error("Flush failed: {reason}")]
    FlushFailed { reason: String },
}

impl CodecError {
    /// Creates a new unsupported codec error.
    pub fn unsupported(kind: TrackKind, codec: impl Into<String>) -> Self {
        Self::Unsupported {
            kind,
            codec: codec.into(),
        }
    }

    /// Creates a new configure failed error.
    pub fn configure_failed(kind: TrackKind, reason: impl Into<String>) -> Self {
        Self::ConfigureFailed {
            kind,
            reason: reason.into(),
        }
    }

    /// Creates a new decode failed error.
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new encode failed error.
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        Self::EncodeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new flush failed error.
    pub fn flush_failed(reason: impl Into<String>) -> Self {
        Self::FlushFailed {
            reason: reason.into(),
        }
    }
}
