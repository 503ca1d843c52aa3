//! Configuration loading and validation.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::*;
pub use validate::validate_config;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or checking a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ParseError(String),

    /// A value is out of range or conflicts with another one.
    #[error("Invalid value for {field}: {reason}")]
    ValidationError { field: &'static str, reason: String },
}
