//! Mock codec factory for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::codec::{
    AudioEncoderConfig, CodecError, CodecFactory, Decoder, Encoder, VideoEncoderConfig,
};
use crate::media::{AudioData, CodedSample, TrackDescriptor, TrackKind, VideoFrame};

/// Counters shared by all codecs created from one factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecCalls {
    pub video_decoders: usize,
    pub video_encoders: usize,
    pub audio_decoders: usize,
    pub audio_encoders: usize,
    pub video_decoded: usize,
    pub video_encoded: usize,
    pub audio_decoded: usize,
    pub audio_encoded: usize,
    pub decoder_flushes: usize,
    pub encoder_flushes: usize,
}

impl CodecCalls {
    /// Total number of codecs created.
    pub fn codecs_created(&self) -> usize {
        self.video_decoders + self.video_encoders + self.audio_decoders + self.audio_encoders
    }
}

#[derive(Debug, Default)]
struct Behavior {
    unsupported: HashSet<TrackKind>,
    fail_decode_after: Option<usize>,
    hold_back: bool,
}

/// Mock implementation of the CodecFactory trait.
///
/// Decoders turn every sample into one frame carrying the sample payload;
/// encoders turn every frame back into one chunk carrying the frame payload.
///
/// Provides controllable behavior for testing:
/// - Refuse to create codecs for a track kind
/// - Fail decoding after a number of samples
/// - Hold one frame back in every codec until flush
/// - Count every codec call
#[derive(Debug, Clone)]
pub struct MockCodecFactory {
    calls: Arc<RwLock<CodecCalls>>,
    behavior: Arc<RwLock<Behavior>>,
    video_configs: Arc<RwLock<Vec<VideoEncoderConfig>>>,
    audio_configs: Arc<RwLock<Vec<AudioEncoderConfig>>>,
}

impl Default for MockCodecFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCodecFactory {
    /// Create a new mock codec factory.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(CodecCalls::default())),
            behavior: Arc::new(RwLock::new(Behavior::default())),
            video_configs: Arc::new(RwLock::new(Vec::new())),
            audio_configs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Refuse to create codecs for the given kind.
    pub async fn set_unsupported(&self, kind: TrackKind) {
        self.behavior.write().await.unsupported.insert(kind);
    }

    /// Fail every decode once `count` samples were decoded by the factory's decoders.
    pub async fn set_fail_decode_after(&self, count: usize) {
        self.behavior.write().await.fail_decode_after = Some(count);
    }

    /// Make decoders and encoders buffer one item until flushed.
    pub async fn set_hold_back(&self, enabled: bool) {
        self.behavior.write().await.hold_back = enabled;
    }

    /// Snapshot of all counters.
    pub async fn calls(&self) -> CodecCalls {
        self.calls.read().await.clone()
    }

    /// Get all recorded video encoder configurations.
    pub async fn recorded_video_configs(&self) -> Vec<VideoEncoderConfig> {
        self.video_configs.read().await.clone()
    }

    /// Get all recorded audio encoder configurations.
    pub async fn recorded_audio_configs(&self) -> Vec<AudioEncoderConfig> {
        self.audio_configs.read().await.clone()
    }

    async fn check_supported(&self, kind: TrackKind, codec: &str) -> Result<(), CodecError> {
        if self.behavior.read().await.unsupported.contains(&kind) {
            return Err(CodecError::unsupported(kind, codec));
        }
        Ok(())
    }

    async fn hold_back(&self) -> bool {
        self.behavior.read().await.hold_back
    }
}

/// Converts between coded samples and one kind of decoded frame.
trait MockFrame: Send + Sized + 'static {
    const KIND: TrackKind;

    fn from_sample(sample: CodedSample) -> Self;

    fn into_chunk(self) -> CodedSample;
}

impl MockFrame for VideoFrame {
    const KIND: TrackKind = TrackKind::Video;

    fn from_sample(sample: CodedSample) -> Self {
        VideoFrame {
            timestamp_us: sample.timestamp_us,
            duration_us: sample.duration_us,
            width: 0,
            height: 0,
            data: sample.data,
        }
    }

    fn into_chunk(self) -> CodedSample {
        CodedSample {
            track_id: 0,
            timestamp_us: self.timestamp_us,
            duration_us: self.duration_us,
            key: true,
            data: self.data,
        }
    }
}

impl MockFrame for AudioData {
    const KIND: TrackKind = TrackKind::Audio;

    fn from_sample(sample: CodedSample) -> Self {
        AudioData {
            timestamp_us: sample.timestamp_us,
            duration_us: sample.duration_us,
            sample_rate: 48_000,
            channels: 2,
            frames: (sample.duration_us * 48 / 1000) as u32,
            data: sample.data,
        }
    }

    fn into_chunk(self) -> CodedSample {
        CodedSample {
            track_id: 0,
            timestamp_us: self.timestamp_us,
            duration_us: self.duration_us,
            key: true,
            data: self.data,
        }
    }
}

struct MockDecoder {
    calls: Arc<RwLock<CodecCalls>>,
    behavior: Arc<RwLock<Behavior>>,
    held: Option<CodedSample>,
    hold_back: bool,
}

impl MockDecoder {
    async fn next<F: MockFrame>(&mut self, sample: CodedSample) -> Result<Vec<F>, CodecError> {
        let fail_after = self.behavior.read().await.fail_decode_after;
        {
            let mut calls = self.calls.write().await;
            let decoded = match F::KIND {
                TrackKind::Video => &mut calls.video_decoded,
                TrackKind::Audio => &mut calls.audio_decoded,
            };
            if fail_after.is_some_and(|limit| *decoded >= limit) {
                return Err(CodecError::decode_failed("mock decoder failure"));
            }
            *decoded += 1;
        }

        if !self.hold_back {
            return Ok(vec![F::from_sample(sample)]);
        }
        Ok(self
            .held
            .replace(sample)
            .map(F::from_sample)
            .into_iter()
            .collect())
    }

    async fn drain<F: MockFrame>(&mut self) -> Vec<F> {
        self.calls.write().await.decoder_flushes += 1;
        self.held.take().map(F::from_sample).into_iter().collect()
    }
}

#[async_trait]
impl Decoder<VideoFrame> for MockDecoder {
    async fn decode(&mut self, sample: CodedSample) -> Result<Vec<VideoFrame>, CodecError> {
        self.next::<VideoFrame>(sample).await
    }

    async fn flush(&mut self) -> Result<Vec<VideoFrame>, CodecError> {
        Ok(self.drain::<VideoFrame>().await)
    }
}

#[async_trait]
impl Decoder<AudioData> for MockDecoder {
    async fn decode(&mut self, sample: CodedSample) -> Result<Vec<AudioData>, CodecError> {
        self.next::<AudioData>(sample).await
    }

    async fn flush(&mut self) -> Result<Vec<AudioData>, CodecError> {
        Ok(self.drain::<AudioData>().await)
    }
}

struct MockEncoder<F> {
    calls: Arc<RwLock<CodecCalls>>,
    held: Option<F>,
    hold_back: bool,
}

#[async_trait]
impl<F: MockFrame> Encoder<F> for MockEncoder<F> {
    async fn encode(&mut self, frame: F) -> Result<Vec<CodedSample>, CodecError> {
        {
            let mut calls = self.calls.write().await;
            match F::KIND {
                TrackKind::Video => calls.video_encoded += 1,
                TrackKind::Audio => calls.audio_encoded += 1,
            }
        }

        if !self.hold_back {
            return Ok(vec![frame.into_chunk()]);
        }
        Ok(self
            .held
            .replace(frame)
            .map(F::into_chunk)
            .into_iter()
            .collect())
    }

    async fn flush(&mut self) -> Result<Vec<CodedSample>, CodecError> {
        self.calls.write().await.encoder_flushes += 1;
        Ok(self.held.take().map(F::into_chunk).into_iter().collect())
    }
}

#[async_trait]
impl CodecFactory for MockCodecFactory {
    fn name(&self) -> &str {
        "mock"
    }

    async fn video_decoder(
        &self,
        track: &TrackDescriptor,
    ) -> Result<Box<dyn Decoder<VideoFrame>>, CodecError> {
        self.check_supported(TrackKind::Video, &track.codec).await?;
        self.calls.write().await.video_decoders += 1;
        Ok(Box::new(MockDecoder {
            calls: Arc::clone(&self.calls),
            behavior: Arc::clone(&self.behavior),
            held: None,
            hold_back: self.hold_back().await,
        }))
    }

    async fn video_encoder(
        &self,
        config: &VideoEncoderConfig,
    ) -> Result<Box<dyn Encoder<VideoFrame>>, CodecError> {
        self.check_supported(TrackKind::Video, config.codec.codec_string())
            .await?;
        self.calls.write().await.video_encoders += 1;
        self.video_configs.write().await.push(config.clone());
        Ok(Box::new(MockEncoder::<VideoFrame> {
            calls: Arc::clone(&self.calls),
            held: None,
            hold_back: self.hold_back().await,
        }))
    }

    async fn audio_decoder(
        &self,
        track: &TrackDescriptor,
    ) -> Result<Box<dyn Decoder<AudioData>>, CodecError> {
        self.check_supported(TrackKind::Audio, &track.codec).await?;
        self.calls.write().await.audio_decoders += 1;
        Ok(Box::new(MockDecoder {
            calls: Arc::clone(&self.calls),
            behavior: Arc::clone(&self.behavior),
            held: None,
            hold_back: self.hold_back().await,
        }))
    }

    async fn audio_encoder(
        &self,
        config: &AudioEncoderConfig,
    ) -> Result<Box<dyn Encoder<AudioData>>, CodecError> {
        self.check_supported(TrackKind::Audio, config.codec.codec_string())
            .await?;
        self.calls.write().await.audio_encoders += 1;
        self.audio_configs.write().await.push(config.clone());
        Ok(Box::new(MockEncoder::<AudioData> {
            calls: Arc::clone(&self.calls),
            held: None,
            hold_back: self.hold_back().await,
        }))
    }
}
