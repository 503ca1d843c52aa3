use super::{types::Config, ConfigError};

/// Lowest and highest bitrates accepted for re-encoded audio (bits per second).
const AUDIO_BITRATE_RANGE: std::ops::RangeInclusive<u32> = 6_000..=510_000;

/// Validate configuration
/// Currently validates:
/// - Audio bitrate is within the range Opus accepts
/// - Storage buffer size is not 0
/// - Temp and output directories differ
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !AUDIO_BITRATE_RANGE.contains(&config.converter.audio_bitrate) {
        return Err(ConfigError::ValidationError {
            field: "converter.audio_bitrate",
            reason: format!(
                "must be between {} and {}, got {}",
                AUDIO_BITRATE_RANGE.start(),
                AUDIO_BITRATE_RANGE.end(),
                config.converter.audio_bitrate
            ),
        });
    }

    if config.storage.buffer_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "storage.buffer_size",
            reason: "cannot be 0".to_string(),
        });
    }

    if config.storage.temp_dir == config.storage.output_dir {
        return Err(ConfigError::ValidationError {
            field: "storage.output_dir",
            reason: "must differ from storage.temp_dir".to_string(),
        });
    }

    Ok(())
}
