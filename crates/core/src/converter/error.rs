//! Error types for the converter module.

use thiserror::Error;

use crate::codec::CodecError;
use crate::parser::ParseError;
use crate::writer::WriterError;

/// Errors that can settle a conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The requested target is not supported. Detected before any work starts.
    #[error("Invalid conversion request: {reason}")]
    Validation { reason: String },

    /// The caller cancelled the conversion.
    #[error("Conversion aborted by caller")]
    AbortedByCaller,

    /// A component was stopped because the conversion was already failing.
    #[error("Conversion aborted: {reason}")]
    AbortedInternally { reason: String },

    /// The container parser failed.
    #[error("Parse error: {0}")]
    Parse(ParseError),

    /// A decoder or encoder failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The output writer failed.
    #[error("Writer error: {0}")]
    Write(#[from] WriterError),

    /// The caller-supplied frame hook returned an error.
    #[error("Frame hook failed on track {track_id}: {reason}")]
    FrameHook { track_id: u32, reason: String },

    /// I/O error outside of the writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseError> for ConvertError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::Aborted { reason } => Self::AbortedInternally { reason },
            other => Self::Parse(other),
        }
    }
}

impl ConvertError {
    /// Creates a new validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Creates a new internal abort error.
    pub fn aborted_internally(reason: impl Into<String>) -> Self {
        Self::AbortedInternally {
            reason: reason.into(),
        }
    }

    /// Creates a new frame hook error.
    pub fn frame_hook(track_id: u32, error: anyhow::Error) -> Self {
        Self::FrameHook {
            track_id,
            reason: format!("{:#}", error),
        }
    }

    /// Whether the conversion was stopped rather than broken.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::AbortedByCaller | Self::AbortedInternally { .. })
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::AbortedByCaller => "aborted_by_caller",
            Self::AbortedInternally { .. } => "aborted_internally",
            Self::Parse(_) => "parse",
            Self::Codec(_) => "codec",
            Self::Write(_) => "write",
            Self::FrameHook { .. } => "frame_hook",
            Self::Io(_) => "io",
        }
    }
}
