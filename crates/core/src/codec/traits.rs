//! Trait definitions for the codec module.

use async_trait::async_trait;

use super::error::CodecError;
use crate::converter::{AudioCodec, VideoCodec};
use crate::media::{AudioData, CodedSample, TrackDescriptor, VideoFrame};

/// Turns coded samples into decoded frames of type `F`.
///
/// A decoder may buffer: a call to `decode` can return zero or several
/// frames. Anything still buffered is returned by `flush`.
#[async_trait]
pub trait Decoder<F: Send + 'static>: Send {
    /// Decodes one coded sample.
    async fn decode(&mut self, sample: CodedSample) -> Result<Vec<F>, CodecError>;

    /// Drains buffered frames at end of track.
    async fn flush(&mut self) -> Result<Vec<F>, CodecError>;
}

/// Turns decoded frames of type `F` into coded samples.
#[async_trait]
pub trait Encoder<F: Send + 'static>: Send {
    /// Encodes one frame. May return zero or several chunks.
    async fn encode(&mut self, frame: F) -> Result<Vec<CodedSample>, CodecError>;

    /// Drains buffered chunks at end of track.
    async fn flush(&mut self) -> Result<Vec<CodedSample>, CodecError>;
}

/// Settings for a video encoder. Dimensions follow the source track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncoderConfig {
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
}

/// Settings for an audio encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEncoderConfig {
    pub codec: AudioCodec,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
    pub sample_rate: u32,
    pub channels: u8,
}

/// Creates codec instances for a conversion.
#[async_trait]
pub trait CodecFactory: Send + Sync {
    /// Returns the name of this codec implementation.
    fn name(&self) -> &str;

    /// Creates a decoder for a source video track.
    async fn video_decoder(
        &self,
        track: &TrackDescriptor,
    ) -> Result<Box<dyn Decoder<VideoFrame>>, CodecError>;

    /// Creates a video encoder.
    async fn video_encoder(
        &self,
        config: &VideoEncoderConfig,
    ) -> Result<Box<dyn Encoder<VideoFrame>>, CodecError>;

    /// Creates a decoder for a source audio track.
    async fn audio_decoder(
        &self,
        track: &TrackDescriptor,
    ) -> Result<Box<dyn Decoder<AudioData>>, CodecError>;

    /// Creates an audio encoder.
    async fn audio_encoder(
        &self,
        config: &AudioEncoderConfig,
    ) -> Result<Box<dyn Encoder<AudioData>>, CodecError>;
}
