use serde::{Deserialize, Serialize};

use crate::converter::ConverterConfig;
use crate::writer::StorageConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}
