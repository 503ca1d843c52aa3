//! Error types for the writer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or persisting output.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Failed to create the backing storage for a new output.
    #[error("Failed to create output at {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A chunk was rejected by the writer.
    #[error("Failed to write chunk for track {track_id}: {reason}")]
    WriteFailed { track_id: u32, reason: String },

    /// A chunk referenced a track that was never added.
    #[error("Unknown output track: {track_id}")]
    UnknownTrack { track_id: u32 },

    /// The writer was already finalized or discarded.
    #[error("Writer is already closed")]
    AlreadyClosed,

    /// The finished output was removed before it was saved.
    #[error("Output was removed")]
    Removed,

    /// Failed to persist the finished output.
    #[error("Failed to save output to {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WriterError {
    /// Creates a new write failed error.
    pub fn write_failed(track_id: u32, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            track_id,
            reason: reason.into(),
        }
    }

    /// Creates a new create failed error.
    pub fn create_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::CreateFailed { path, source }
    }

    /// Creates a new save failed error.
    pub fn save_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::SaveFailed { path, source }
    }
}
