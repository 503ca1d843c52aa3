//! In-memory output writer.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::sync::{Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

use super::error::WriterError;
use super::stream::ChunkStream;
use super::traits::{Artifact, FinishedOutput, OutputTrack, OutputWriter, WriterProgress};
use crate::media::CodedSample;

/// Keeps the whole output in memory.
#[derive(Debug)]
pub struct BufferWriter {
    conversion_id: Uuid,
    stream: ChunkStream,
    buffer: Option<BytesMut>,
}

impl BufferWriter {
    pub fn new(conversion_id: Uuid) -> Self {
        Self {
            conversion_id,
            stream: ChunkStream::default(),
            buffer: Some(BytesMut::new()),
        }
    }
}

#[async_trait]
impl OutputWriter for BufferWriter {
    fn name(&self) -> &str {
        "buffer"
    }

    async fn add_track(&mut self, track: OutputTrack) -> Result<u32, WriterError> {
        if self.buffer.is_none() {
            return Err(WriterError::AlreadyClosed);
        }
        Ok(self.stream.add_track(track))
    }

    async fn accept_chunk(&mut self, chunk: CodedSample) -> Result<WriterProgress, WriterError> {
        let buffer = self.buffer.as_mut().ok_or(WriterError::AlreadyClosed)?;
        let before = buffer.len();
        self.stream.encode(&chunk, buffer)?;
        let written = buffer.len() - before;
        Ok(self.stream.record(&chunk, written))
    }

    async fn finalize(&mut self) -> Result<Box<dyn FinishedOutput>, WriterError> {
        let buffer = self.buffer.take().ok_or(WriterError::AlreadyClosed)?;
        debug!(
            "Finalized in-memory output for conversion {} ({} bytes, {} tracks)",
            self.conversion_id,
            buffer.len(),
            self.stream.tracks().len()
        );
        Ok(Box::new(MemoryOutput::new(buffer.freeze())))
    }

    async fn discard(&mut self) -> Result<(), WriterError> {
        if self.buffer.take().is_some() {
            debug!("Discarded in-memory output for conversion {}", self.conversion_id);
        }
        Ok(())
    }
}

/// Finalized output held in memory.
#[derive(Debug)]
pub struct MemoryOutput {
    size_bytes: u64,
    data: Mutex<Option<Bytes>>,
}

impl MemoryOutput {
    pub fn new(data: Bytes) -> Self {
        Self {
            size_bytes: data.len() as u64,
            data: Mutex::new(Some(data)),
        }
    }
}

#[async_trait]
impl FinishedOutput for MemoryOutput {
    fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    async fn save(&self) -> Result<Artifact, WriterError> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.clone().map(Artifact::Memory).ok_or(WriterError::Removed)
    }

    async fn remove(&self) -> Result<(), WriterError> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}
