//! Configuration for the converter module.

use serde::{Deserialize, Serialize};

/// Encoding policy applied to every conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Bitrate of re-encoded audio tracks in bits per second.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: u32,
}

fn default_audio_bitrate() -> u32 {
    128_000
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

impl ConverterConfig {
    /// Sets the audio bitrate.
    pub fn with_audio_bitrate(mut self, bitrate: u32) -> Self {
        self.audio_bitrate = bitrate;
        self
    }
}
