//! Mock writer factory for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::converter::ContainerFormat;
use crate::media::CodedSample;
use crate::writer::{
    BufferWriter, FinishedOutput, OutputTrack, OutputWriter, WriterError, WriterFactory,
    WriterProgress,
};

/// Everything the writers of one factory were asked to do.
#[derive(Debug, Clone, Default)]
pub struct WriterLog {
    /// Conversion ids and containers passed to `create`.
    pub writers_created: Vec<(Uuid, ContainerFormat)>,
    pub tracks: Vec<OutputTrack>,
    pub chunks: Vec<CodedSample>,
    /// Progress returned for each accepted chunk, in order.
    pub progress: Vec<WriterProgress>,
    pub finalize_calls: usize,
    pub discard_calls: usize,
}

#[derive(Debug, Default)]
struct Behavior {
    next_create_error: Option<WriterError>,
    fail_on_chunk: Option<usize>,
}

/// Mock implementation of the WriterFactory trait.
///
/// Writers store the output in memory the way [`BufferWriter`] does and
/// log every call into a log shared by the factory and its writers.
///
/// Provides controllable behavior for testing:
/// - Fail writer creation
/// - Reject the n-th chunk (0-based)
#[derive(Debug, Clone)]
pub struct MockWriterFactory {
    log: Arc<RwLock<WriterLog>>,
    behavior: Arc<RwLock<Behavior>>,
}

impl Default for MockWriterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWriterFactory {
    /// Create a new mock writer factory.
    pub fn new() -> Self {
        Self {
            log: Arc::new(RwLock::new(WriterLog::default())),
            behavior: Arc::new(RwLock::new(Behavior::default())),
        }
    }

    /// Configure the next `create` call to fail.
    pub async fn set_next_create_error(&self, error: WriterError) {
        self.behavior.write().await.next_create_error = Some(error);
    }

    /// Reject the chunk with the given 0-based index.
    pub async fn set_fail_on_chunk(&self, index: usize) {
        self.behavior.write().await.fail_on_chunk = Some(index);
    }

    /// Snapshot of the call log.
    pub async fn log(&self) -> WriterLog {
        self.log.read().await.clone()
    }
}

#[async_trait]
impl WriterFactory for MockWriterFactory {
    async fn create(
        &self,
        conversion_id: Uuid,
        container: ContainerFormat,
    ) -> Result<Box<dyn OutputWriter>, WriterError> {
        if let Some(err) = self.behavior.write().await.next_create_error.take() {
            return Err(err);
        }
        self.log
            .write()
            .await
            .writers_created
            .push((conversion_id, container));
        Ok(Box::new(MockWriter {
            inner: BufferWriter::new(conversion_id),
            log: Arc::clone(&self.log),
            behavior: Arc::clone(&self.behavior),
        }))
    }
}

/// Writer handed out by [`MockWriterFactory`].
#[derive(Debug)]
pub struct MockWriter {
    inner: BufferWriter,
    log: Arc<RwLock<WriterLog>>,
    behavior: Arc<RwLock<Behavior>>,
}

#[async_trait]
impl OutputWriter for MockWriter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add_track(&mut self, track: OutputTrack) -> Result<u32, WriterError> {
        let number = self.inner.add_track(track.clone()).await?;
        self.log.write().await.tracks.push(track);
        Ok(number)
    }

    async fn accept_chunk(&mut self, chunk: CodedSample) -> Result<WriterProgress, WriterError> {
        let index = self.log.read().await.chunks.len();
        if self.behavior.read().await.fail_on_chunk == Some(index) {
            return Err(WriterError::write_failed(chunk.track_id, "mock write failure"));
        }
        let progress = self.inner.accept_chunk(chunk.clone()).await?;
        let mut log = self.log.write().await;
        log.chunks.push(chunk);
        log.progress.push(progress);
        Ok(progress)
    }

    async fn finalize(&mut self) -> Result<Box<dyn FinishedOutput>, WriterError> {
        self.log.write().await.finalize_calls += 1;
        self.inner.finalize().await
    }

    async fn discard(&mut self) -> Result<(), WriterError> {
        self.log.write().await.discard_calls += 1;
        self.inner.discard().await
    }
}
