//! Trait definitions for the writer module.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::error::WriterError;
use crate::converter::ContainerFormat;
use crate::media::{CodedSample, TrackKind, TrackParams};

/// A track of the output container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputTrack {
    pub kind: TrackKind,
    /// Codec string of the samples written to this track.
    pub codec: String,
    pub timescale: u32,
    pub params: TrackParams,
}

/// Cumulative totals after a chunk was accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterProgress {
    pub bytes_written: u64,
    pub milliseconds_written: u64,
}

/// A persisted conversion output.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// The output was saved as a file.
    File { path: PathBuf, size_bytes: u64 },
    /// The output lives in memory.
    Memory(Bytes),
}

impl Artifact {
    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::File { size_bytes, .. } => *size_bytes,
            Self::Memory(bytes) => bytes.len() as u64,
        }
    }
}

/// Sink for the chunks of one output container.
///
/// Chunks are accepted in append order. `finalize` and `discard` are each
/// called at most once, and never both successfully.
#[async_trait]
pub trait OutputWriter: Send {
    /// Returns the name of this writer implementation.
    fn name(&self) -> &str;

    /// Registers an output track and returns its track number.
    async fn add_track(&mut self, track: OutputTrack) -> Result<u32, WriterError>;

    /// Appends a chunk. The chunk's `track_id` is an output track number.
    async fn accept_chunk(&mut self, chunk: CodedSample) -> Result<WriterProgress, WriterError>;

    /// Completes the output.
    async fn finalize(&mut self) -> Result<Box<dyn FinishedOutput>, WriterError>;

    /// Throws away everything written so far.
    async fn discard(&mut self) -> Result<(), WriterError>;
}

/// A finalized output, not yet handed to the caller's storage.
#[async_trait]
pub trait FinishedOutput: Send + Sync {
    /// Size of the output in bytes.
    fn size_bytes(&self) -> u64;

    /// Persists the output. Calling it again returns an equivalent artifact.
    async fn save(&self) -> Result<Artifact, WriterError>;

    /// Releases the intermediate output. Anything already saved stays intact.
    async fn remove(&self) -> Result<(), WriterError>;
}

/// Creates the writer of a conversion.
#[async_trait]
pub trait WriterFactory: Send + Sync {
    async fn create(
        &self,
        conversion_id: Uuid,
        container: ContainerFormat,
    ) -> Result<Box<dyn OutputWriter>, WriterError>;
}
