//! Shared access to the writer of one conversion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::WriterError;
use super::traits::{FinishedOutput, OutputTrack, OutputWriter};
use crate::converter::ProgressTracker;
use crate::media::CodedSample;
use crate::metrics;

/// Serializes pipeline access to the writer and forwards its progress.
///
/// `finalize` and `discard` take the writer out, so whichever runs first is
/// the only one that reaches it.
pub struct WriterBinding {
    writer: Mutex<Option<Box<dyn OutputWriter>>>,
    progress: Arc<ProgressTracker>,
    bytes_reported: AtomicU64,
}

impl WriterBinding {
    pub fn new(writer: Box<dyn OutputWriter>, progress: Arc<ProgressTracker>) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            progress,
            bytes_reported: AtomicU64::new(0),
        }
    }

    /// Registers an output track.
    pub async fn add_track(&self, track: OutputTrack) -> Result<u32, WriterError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(WriterError::AlreadyClosed)?;
        writer.add_track(track).await
    }

    /// Appends one chunk and reports the writer's new totals.
    pub async fn write(&self, chunk: CodedSample) -> Result<(), WriterError> {
        let progress = {
            let mut guard = self.writer.lock().await;
            let writer = guard.as_mut().ok_or(WriterError::AlreadyClosed)?;
            writer.accept_chunk(chunk).await?
        };

        let previous = self
            .bytes_reported
            .fetch_max(progress.bytes_written, Ordering::Relaxed);
        if progress.bytes_written > previous {
            metrics::BYTES_WRITTEN.inc_by(progress.bytes_written - previous);
        }
        self.progress.writer_progress(progress);
        Ok(())
    }

    /// Finalizes the writer. On failure the writer stays bound so it can
    /// still be discarded.
    pub async fn finalize(&self) -> Result<Box<dyn FinishedOutput>, WriterError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(WriterError::AlreadyClosed)?;
        let output = writer.finalize().await?;
        guard.take();
        Ok(output)
    }

    /// Discards the writer if it has not been finalized. Safe to call twice.
    pub async fn discard(&self) -> Result<(), WriterError> {
        let writer = self.writer.lock().await.take();
        match writer {
            Some(mut writer) => {
                debug!("Discarding {} writer", writer.name());
                writer.discard().await
            }
            None => Ok(()),
        }
    }

    /// Whether the writer was already finalized or discarded.
    pub async fn is_closed(&self) -> bool {
        self.writer.lock().await.is_none()
    }
}
