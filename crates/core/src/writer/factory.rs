//! Writer selection based on storage capabilities.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use super::buffer::BufferWriter;
use super::capabilities::StorageCapabilities;
use super::config::StorageConfig;
use super::error::WriterError;
use super::file::FileWriter;
use super::traits::{OutputWriter, WriterFactory};
use crate::converter::ContainerFormat;

/// Creates file-backed writers when the temp directory is usable and
/// in-memory writers otherwise. Storage is checked once per factory.
pub struct StorageWriterFactory {
    config: StorageConfig,
    capabilities: OnceCell<StorageCapabilities>,
}

impl StorageWriterFactory {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            capabilities: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the storage capabilities, detecting them on first use.
    pub async fn capabilities(&self) -> &StorageCapabilities {
        self.capabilities
            .get_or_init(|| async {
                let caps = StorageCapabilities::detect(&self.config).await;
                info!(
                    "Storage check: temp dir {} writable = {}",
                    self.config.temp_dir.display(),
                    caps.temp_dir_writable
                );
                caps
            })
            .await
    }
}

#[async_trait]
impl WriterFactory for StorageWriterFactory {
    async fn create(
        &self,
        conversion_id: Uuid,
        container: ContainerFormat,
    ) -> Result<Box<dyn OutputWriter>, WriterError> {
        let use_file =
            self.config.prefer_persistent_storage && self.capabilities().await.supports_file_output();

        if use_file {
            let writer = FileWriter::create(&self.config, conversion_id, container).await?;
            Ok(Box::new(writer))
        } else {
            Ok(Box::new(BufferWriter::new(conversion_id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_writer_when_writable() {
        let dir = TempDir::new().unwrap();
        let factory = StorageWriterFactory::new(
            StorageConfig::default()
                .with_temp_dir(dir.path().join("tmp"))
                .with_output_dir(dir.path().join("out")),
        );
        let writer = factory
            .create(Uuid::new_v4(), ContainerFormat::Webm)
            .await
            .unwrap();
        assert_eq!(writer.name(), "file");
    }

    #[tokio::test]
    async fn test_buffer_writer_when_persistence_disabled() {
        let dir = TempDir::new().unwrap();
        let factory = StorageWriterFactory::new(
            StorageConfig::default()
                .with_temp_dir(dir.path().to_path_buf())
                .with_persistent_storage(false),
        );
        let writer = factory
            .create(Uuid::new_v4(), ContainerFormat::Webm)
            .await
            .unwrap();
        assert_eq!(writer.name(), "buffer");
    }

    #[tokio::test]
    async fn test_buffer_writer_when_temp_dir_unusable() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let factory =
            StorageWriterFactory::new(StorageConfig::default().with_temp_dir(blocker.join("tmp")));

        let writer = factory
            .create(Uuid::new_v4(), ContainerFormat::Webm)
            .await
            .unwrap();
        assert_eq!(writer.name(), "buffer");
        assert!(!factory.capabilities().await.temp_dir_writable);
    }

    #[tokio::test]
    async fn test_capabilities_detected_once() {
        let dir = TempDir::new().unwrap();
        let factory =
            StorageWriterFactory::new(StorageConfig::default().with_temp_dir(dir.path().join("t")));
        let first = factory.capabilities().await as *const StorageCapabilities;
        let second = factory.capabilities().await as *const StorageCapabilities;
        assert_eq!(first, second);
    }
}
