//! Storage capability detection.

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::StorageConfig;

/// What the local storage can do for conversion output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCapabilities {
    /// The temp directory exists (or could be created) and accepts writes.
    pub temp_dir_writable: bool,
}

impl StorageCapabilities {
    /// Checks the temp directory by writing and removing a small file.
    pub async fn detect(config: &StorageConfig) -> Self {
        if let Err(e) = fs::create_dir_all(&config.temp_dir).await {
            warn!(
                "Temp directory {} is unavailable: {}",
                config.temp_dir.display(),
                e
            );
            return Self::default();
        }

        let marker = config.temp_dir.join(format!(".writable-{}", Uuid::new_v4()));
        let temp_dir_writable = match fs::write(&marker, b"ok").await {
            Ok(()) => {
                if let Err(e) = fs::remove_file(&marker).await {
                    debug!("Failed to remove marker {}: {}", marker.display(), e);
                }
                true
            }
            Err(e) => {
                warn!(
                    "Temp directory {} is not writable: {}",
                    config.temp_dir.display(),
                    e
                );
                false
            }
        };

        Self { temp_dir_writable }
    }

    /// Whether output can be streamed to disk.
    pub fn supports_file_output(&self) -> bool {
        self.temp_dir_writable
    }
}
