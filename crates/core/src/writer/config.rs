//! Configuration for the built-in storage writers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how conversion output is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for in-progress output files.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Directory that saved outputs are placed in.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Use file-backed output when the temp directory is writable.
    #[serde(default = "default_true")]
    pub prefer_persistent_storage: bool,

    /// Write buffer size for file-backed output in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("webconvert")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    256 * 1024 // 256 KB
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            output_dir: default_output_dir(),
            prefer_persistent_storage: true,
            buffer_size: default_buffer_size(),
        }
    }
}

impl StorageConfig {
    /// Sets the temp directory.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Sets the output directory.
    pub fn with_output_dir(mut self, output_dir: PathBuf) -> Self {
        self.output_dir = output_dir;
        self
    }

    /// Enables or disables file-backed output.
    pub fn with_persistent_storage(mut self, enabled: bool) -> Self {
        self.prefer_persistent_storage = enabled;
        self
    }

    /// Sets the write buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StorageConfig::default();
        assert!(config.prefer_persistent_storage);
        assert_eq!(config.buffer_size, 256 * 1024);
        assert!(config.temp_dir.ends_with("webconvert"));
    }

    #[test]
    fn test_config_builder() {
        let config = StorageConfig::default()
            .with_temp_dir(PathBuf::from("/tmp/wc"))
            .with_output_dir(PathBuf::from("/srv/out"))
            .with_persistent_storage(false)
            .with_buffer_size(4096);

        assert_eq!(config.temp_dir, PathBuf::from("/tmp/wc"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/out"));
        assert!(!config.prefer_persistent_storage);
        assert_eq!(config.buffer_size, 4096);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: StorageConfig = toml::from_str(r#"output_dir = "/data/out""#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/data/out"));
        assert!(config.prefer_persistent_storage);
    }
}
