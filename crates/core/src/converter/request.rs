//! Conversion requests.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::error::ConvertError;
use super::progress::{ConversionState, FnObserver, ProgressObserver};
use super::resolver::TrackResolvers;
use super::traits::{DurationObserver, FrameHook, TrackResolver};
use super::types::{AudioCodec, ContainerFormat, ConversionTarget, VideoCodec};
use crate::media::{Source, VideoFrame};
use crate::parser::ParseFields;

/// Everything needed to start one conversion.
///
/// Built with consuming `with_*` methods and handed to
/// [`Converter::convert`](super::Converter::convert), which checks it before
/// anything runs.
#[derive(Clone)]
pub struct ConversionRequest {
    pub(crate) source: Source,
    pub(crate) target: ConversionTarget,
    pub(crate) resolvers: TrackResolvers,
    pub(crate) frame_hook: Option<Arc<dyn FrameHook<VideoFrame>>>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) progress_observer: Option<Arc<dyn ProgressObserver>>,
    pub(crate) duration_observer: Option<Arc<dyn DurationObserver>>,
    pub(crate) fields: ParseFields,
}

impl ConversionRequest {
    /// Creates a request converting `source` to WebM with VP8 and Opus.
    pub fn new(source: impl Into<Source>) -> Self {
        Self {
            source: source.into(),
            target: ConversionTarget::default(),
            resolvers: TrackResolvers::default(),
            frame_hook: None,
            cancellation: None,
            progress_observer: None,
            duration_observer: None,
            fields: ParseFields::default(),
        }
    }

    /// Sets the whole target.
    pub fn with_target(mut self, target: ConversionTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the output container.
    pub fn with_container(mut self, container: ContainerFormat) -> Self {
        self.target.container = container;
        self
    }

    /// Sets the codec for re-encoded video tracks.
    pub fn with_video_codec(mut self, codec: VideoCodec) -> Self {
        self.target.video_codec = codec;
        self
    }

    /// Sets the codec for re-encoded audio tracks.
    pub fn with_audio_codec(mut self, codec: AudioCodec) -> Self {
        self.target.audio_codec = codec;
        self
    }

    /// Overrides the action chosen for video tracks.
    pub fn with_video_resolver(mut self, resolver: impl TrackResolver<VideoCodec> + 'static) -> Self {
        self.resolvers.video = Some(Arc::new(resolver));
        self
    }

    /// Overrides the action chosen for audio tracks.
    pub fn with_audio_resolver(mut self, resolver: impl TrackResolver<AudioCodec> + 'static) -> Self {
        self.resolvers.audio = Some(Arc::new(resolver));
        self
    }

    /// Runs `hook` on every decoded video frame before it is encoded.
    pub fn with_frame_hook(mut self, hook: impl FrameHook<VideoFrame> + 'static) -> Self {
        self.frame_hook = Some(Arc::new(hook));
        self
    }

    /// Stops the conversion when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Calls `observer` every time a progress counter advances.
    pub fn with_progress<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ConversionState) + Send + Sync + 'static,
    {
        self.progress_observer = Some(Arc::new(FnObserver(observer)));
        self
    }

    /// Publishes progress into a watch channel.
    pub fn with_progress_channel(mut self, sender: watch::Sender<ConversionState>) -> Self {
        self.progress_observer = Some(Arc::new(sender));
        self
    }

    /// Calls `observer` with the source duration in seconds.
    pub fn with_duration_observer(mut self, observer: impl DurationObserver + 'static) -> Self {
        self.duration_observer = Some(Arc::new(observer));
        self
    }

    /// Requests extra fields from the parser. Duration is always requested.
    pub fn with_fields(mut self, fields: ParseFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn target(&self) -> &ConversionTarget {
        &self.target
    }

    /// Checks the target against what the converter can produce.
    pub fn validate(&self) -> Result<(), ConvertError> {
        let target = &self.target;
        if !target.container.is_supported_target() {
            return Err(ConvertError::validation(format!(
                "unsupported container \"{}\", only \"webm\" is supported",
                target.container
            )));
        }
        if !target.video_codec.is_supported_target() {
            return Err(ConvertError::validation(format!(
                "unsupported video codec \"{}\", only \"vp8\" and \"vp9\" are supported",
                target.video_codec
            )));
        }
        if !target.audio_codec.is_supported_target() {
            return Err(ConvertError::validation(format!(
                "unsupported audio codec \"{}\", only \"opus\" is supported",
                target.audio_codec
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ConversionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("source", &self.source.describe())
            .field("target", &self.target)
            .field("video_resolver", &self.resolvers.video.is_some())
            .field("audio_resolver", &self.resolvers.audio.is_some())
            .field("frame_hook", &self.frame_hook.is_some())
            .field("cancellation", &self.cancellation.is_some())
            .field("fields", &self.fields)
            .finish()
    }
}
