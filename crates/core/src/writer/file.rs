//! File-backed output writer.

use async_trait::async_trait;
use bytes::BytesMut;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::StorageConfig;
use super::error::WriterError;
use super::stream::ChunkStream;
use super::traits::{Artifact, FinishedOutput, OutputTrack, OutputWriter, WriterProgress};
use crate::converter::ContainerFormat;
use crate::media::CodedSample;

/// Streams the output into a temp file.
pub struct FileWriter {
    temp_path: PathBuf,
    output_path: PathBuf,
    file: Option<BufWriter<File>>,
    stream: ChunkStream,
    scratch: BytesMut,
    // Set once the temp file has been handed to a `FileOutput`.
    finalized: bool,
}

impl FileWriter {
    /// Creates the temp file for a conversion.
    pub async fn create(
        config: &StorageConfig,
        conversion_id: Uuid,
        container: ContainerFormat,
    ) -> Result<Self, WriterError> {
        fs::create_dir_all(&config.temp_dir)
            .await
            .map_err(|e| WriterError::create_failed(config.temp_dir.clone(), e))?;

        let file_name = format!("{}.{}", conversion_id, container.extension());
        let temp_path = config.temp_dir.join(format!("{}.part", file_name));
        let output_path = config.output_dir.join(file_name);

        let file = File::create(&temp_path)
            .await
            .map_err(|e| WriterError::create_failed(temp_path.clone(), e))?;

        debug!("Writing conversion {} to {}", conversion_id, temp_path.display());

        Ok(Self {
            temp_path,
            output_path,
            file: Some(BufWriter::with_capacity(config.buffer_size.max(1), file)),
            stream: ChunkStream::default(),
            scratch: BytesMut::new(),
            finalized: false,
        })
    }

    /// Path of the in-progress file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }
}

#[async_trait]
impl OutputWriter for FileWriter {
    fn name(&self) -> &str {
        "file"
    }

    async fn add_track(&mut self, track: OutputTrack) -> Result<u32, WriterError> {
        if self.file.is_none() {
            return Err(WriterError::AlreadyClosed);
        }
        Ok(self.stream.add_track(track))
    }

    async fn accept_chunk(&mut self, chunk: CodedSample) -> Result<WriterProgress, WriterError> {
        let file = self.file.as_mut().ok_or(WriterError::AlreadyClosed)?;
        self.scratch.clear();
        self.stream.encode(&chunk, &mut self.scratch)?;
        file.write_all(&self.scratch).await?;
        Ok(self.stream.record(&chunk, self.scratch.len()))
    }

    async fn finalize(&mut self) -> Result<Box<dyn FinishedOutput>, WriterError> {
        let mut file = self.file.take().ok_or(WriterError::AlreadyClosed)?;
        file.flush().await?;
        file.get_mut().sync_all().await?;
        drop(file);

        let size_bytes = fs::metadata(&self.temp_path).await?.len();
        debug!(
            "Finalized {} ({} bytes, {} tracks)",
            self.temp_path.display(),
            size_bytes,
            self.stream.tracks().len()
        );
        self.finalized = true;

        Ok(Box::new(FileOutput {
            temp_path: self.temp_path.clone(),
            output_path: self.output_path.clone(),
            size_bytes,
        }))
    }

    async fn discard(&mut self) -> Result<(), WriterError> {
        drop(self.file.take());
        if self.finalized {
            return Ok(());
        }
        match fs::remove_file(&self.temp_path).await {
            Ok(()) => debug!("Discarded {}", self.temp_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(WriterError::Io(e)),
        }
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        drop(self.file.take());
        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => debug!("Removed abandoned {}", self.temp_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.temp_path.display(), e),
        }
    }
}

/// Finalized output stored in the temp directory.
#[derive(Debug)]
pub struct FileOutput {
    temp_path: PathBuf,
    output_path: PathBuf,
    size_bytes: u64,
}

impl FileOutput {
    /// Places the temp file at `output_path`, linking when possible.
    async fn place(&self) -> Result<(), WriterError> {
        if let Some(parent) = self.output_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| WriterError::save_failed(parent.to_path_buf(), e))?;
        }

        match fs::hard_link(&self.temp_path, &self.output_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(WriterError::Removed),
            Err(e) => {
                // Links fail across filesystems; fall back to a copy.
                debug!("Hard link failed ({}), copying instead", e);
                fs::copy(&self.temp_path, &self.output_path)
                    .await
                    .map(|_| ())
                    .map_err(|e| WriterError::save_failed(self.output_path.clone(), e))
            }
        }
    }
}

#[async_trait]
impl FinishedOutput for FileOutput {
    fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    async fn save(&self) -> Result<Artifact, WriterError> {
        if fs::try_exists(&self.output_path).await.unwrap_or(false) {
            debug!("{} already saved", self.output_path.display());
        } else {
            self.place().await?;
        }

        Ok(Artifact::File {
            path: self.output_path.clone(),
            size_bytes: self.size_bytes,
        })
    }

    async fn remove(&self) -> Result<(), WriterError> {
        match fs::remove_file(&self.temp_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove {}: {}", self.temp_path.display(), e);
                Err(WriterError::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{TrackKind, TrackParams};
    use bytes::Bytes;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StorageConfig {
        StorageConfig::default()
            .with_temp_dir(dir.path().join("tmp"))
            .with_output_dir(dir.path().join("out"))
            .with_buffer_size(64)
    }

    fn video_track() -> OutputTrack {
        OutputTrack {
            kind: TrackKind::Video,
            codec: "vp8".to_string(),
            timescale: 90_000,
            params: TrackParams::Video {
                width: 320,
                height: 240,
            },
        }
    }

    fn chunk(track_id: u32, index: u64) -> CodedSample {
        CodedSample {
            track_id,
            timestamp_us: index * 33_333,
            duration_us: 33_333,
            key: index == 0,
            data: Bytes::from(vec![7u8; 100]),
        }
    }

    async fn finished(dir: &TempDir) -> (Box<dyn FinishedOutput>, PathBuf) {
        let mut writer = FileWriter::create(&config(dir), Uuid::new_v4(), ContainerFormat::Webm)
            .await
            .unwrap();
        let temp_path = writer.temp_path().to_path_buf();
        let track = writer.add_track(video_track()).await.unwrap();
        for i in 0..3 {
            writer.accept_chunk(chunk(track, i)).await.unwrap();
        }
        (writer.finalize().await.unwrap(), temp_path)
    }

    #[tokio::test]
    async fn test_finalize_writes_temp_file() {
        let dir = TempDir::new().unwrap();
        let (output, temp_path) = finished(&dir).await;
        let on_disk = std::fs::metadata(&temp_path).unwrap().len();
        assert_eq!(output.size_bytes(), on_disk);
        assert_eq!(on_disk, 3 * (crate::writer::CHUNK_HEADER_LEN as u64 + 100));
    }

    #[tokio::test]
    async fn test_save_is_idempotent_and_survives_remove() {
        let dir = TempDir::new().unwrap();
        let (output, temp_path) = finished(&dir).await;

        let first = output.save().await.unwrap();
        let second = output.save().await.unwrap();
        assert_eq!(first, second);

        output.remove().await.unwrap();
        output.remove().await.unwrap();
        assert!(!temp_path.exists());

        let Artifact::File { path, size_bytes } = first else {
            panic!("expected a file artifact");
        };
        assert_eq!(std::fs::metadata(&path).unwrap().len(), size_bytes);
        assert!(path.to_string_lossy().ends_with(".webm"));

        // Saving again after removal returns the same artifact.
        let third = output.save().await.unwrap();
        assert_eq!(third.size_bytes(), size_bytes);
    }

    #[tokio::test]
    async fn test_save_after_remove_without_save_fails() {
        let dir = TempDir::new().unwrap();
        let (output, _) = finished(&dir).await;
        output.remove().await.unwrap();
        assert!(matches!(output.save().await, Err(WriterError::Removed)));
    }

    #[tokio::test]
    async fn test_discard_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let mut writer = FileWriter::create(&config(&dir), Uuid::new_v4(), ContainerFormat::Webm)
            .await
            .unwrap();
        let temp_path = writer.temp_path().to_path_buf();
        let track = writer.add_track(video_track()).await.unwrap();
        writer.accept_chunk(chunk(track, 0)).await.unwrap();

        writer.discard().await.unwrap();
        writer.discard().await.unwrap();
        assert!(!temp_path.exists());
        assert!(matches!(
            writer.accept_chunk(chunk(track, 1)).await,
            Err(WriterError::AlreadyClosed)
        ));
    }

    #[tokio::test]
    async fn test_discard_after_failed_finalize() {
        let dir = TempDir::new().unwrap();
        let mut writer = FileWriter::create(&config(&dir), Uuid::new_v4(), ContainerFormat::Webm)
            .await
            .unwrap();
        let temp_path = writer.temp_path().to_path_buf();
        let track = writer.add_track(video_track()).await.unwrap();
        writer.accept_chunk(chunk(track, 0)).await.unwrap();

        // Finalize can't stat a file that is gone.
        std::fs::remove_file(&temp_path).unwrap();
        assert!(writer.finalize().await.is_err());

        std::fs::write(&temp_path, b"stale").unwrap();
        writer.discard().await.unwrap();
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_unfinished_temp_file() {
        let dir = TempDir::new().unwrap();
        let mut writer = FileWriter::create(&config(&dir), Uuid::new_v4(), ContainerFormat::Webm)
            .await
            .unwrap();
        let temp_path = writer.temp_path().to_path_buf();
        let track = writer.add_track(video_track()).await.unwrap();
        writer.accept_chunk(chunk(track, 0)).await.unwrap();

        drop(writer);
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_drop_keeps_finalized_temp_file() {
        let dir = TempDir::new().unwrap();
        let (output, temp_path) = finished(&dir).await;
        assert!(temp_path.exists());
        output.remove().await.unwrap();
    }
}
