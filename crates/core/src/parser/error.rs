//! Error types for the parser module.

use thiserror::Error;

/// Errors that can occur while demultiplexing a source.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The source could not be read.
    #[error("Failed to read source {source_name}: {reason}")]
    ReadFailed { source_name: String, reason: String },

    /// The container format is not understood by the parser.
    #[error("Unsupported container: {container}")]
    UnsupportedContainer { container: String },

    /// The source is not a valid instance of its container format.
    #[error("Malformed input: {reason}")]
    Malformed { reason: String },

    /// The parser reported the same track twice.
    #[error("Track {track_id} was reported more than once")]
    DuplicateTrack { track_id: u32 },

    /// A track was reported through the callback of the other kind.
    #[error("Track {track_id} is not a {expected} track")]
    KindMismatch { track_id: u32, expected: String },

    /// The conversion was stopped while the parser was delivering samples.
    #[error("Parsing aborted: {reason}")]
    Aborted { reason: String },

    /// I/O error while reading the source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Creates a new read failed error.
    pub fn read_failed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new malformed input error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Creates a new aborted error.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Whether this error only reflects that the conversion was already stopping.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}
