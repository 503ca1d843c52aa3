//! Default per-track action policy.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::sync::Arc;

use super::error::ConvertError;
use super::traits::TrackResolver;
use super::types::{
    AudioCodec, AudioTrackAction, ConversionTarget, TrackAction, VideoCodec, VideoTrackAction,
};
use crate::media::{TrackDescriptor, TrackKind};

/// Codec family of a source codec string, ignoring profile and level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    Vp8,
    Vp9,
    H264,
    H265,
    Av1,
    Opus,
    Mp3,
    Aac,
    Vorbis,
    Flac,
}

static CODEC_PATTERNS: Lazy<Vec<(Regex, CodecFamily)>> = Lazy::new(|| {
    [
        (r"(?i)^vp0?8(\.|$)", CodecFamily::Vp8),
        (r"(?i)^vp0?9(\.|$)", CodecFamily::Vp9),
        (r"(?i)^(avc[13]|h\.?264)(\.|$)", CodecFamily::H264),
        (r"(?i)^(hev1|hvc1|h\.?265|hevc)(\.|$)", CodecFamily::H265),
        (r"(?i)^(av01|av1)(\.|$)", CodecFamily::Av1),
        (r"(?i)^opus$", CodecFamily::Opus),
        (r"(?i)^(mp3|mp4a\.(69|6b))$", CodecFamily::Mp3),
        (r"(?i)^(mp4a|aac)(\.|$)", CodecFamily::Aac),
        (r"(?i)^vorbis$", CodecFamily::Vorbis),
        (r"(?i)^flac$", CodecFamily::Flac),
    ]
    .into_iter()
    .filter_map(|(pattern, family)| Regex::new(pattern).ok().map(|re| (re, family)))
    .collect()
});

impl CodecFamily {
    /// Detects the family of a codec string such as `vp09.00.10.08` or
    /// `mp4a.40.2`. Returns `None` for strings it does not recognise.
    pub fn detect(codec: &str) -> Option<Self> {
        let codec = codec.trim();
        CODEC_PATTERNS
            .iter()
            .find(|(re, _)| re.is_match(codec))
            .map(|(_, family)| *family)
    }
}

impl From<VideoCodec> for CodecFamily {
    fn from(codec: VideoCodec) -> Self {
        match codec {
            VideoCodec::Vp8 => Self::Vp8,
            VideoCodec::Vp9 => Self::Vp9,
            VideoCodec::H264 => Self::H264,
            VideoCodec::H265 => Self::H265,
            VideoCodec::Av1 => Self::Av1,
        }
    }
}

impl From<AudioCodec> for CodecFamily {
    fn from(codec: AudioCodec) -> Self {
        match codec {
            AudioCodec::Opus => Self::Opus,
            AudioCodec::Aac => Self::Aac,
            AudioCodec::Mp3 => Self::Mp3,
            AudioCodec::Vorbis => Self::Vorbis,
            AudioCodec::Flac => Self::Flac,
        }
    }
}

fn default_action<C>(track: &TrackDescriptor, target: &ConversionTarget, codec: C) -> TrackAction<C>
where
    C: Into<CodecFamily> + Copy,
{
    if !target.container.can_carry(track.kind()) {
        return TrackAction::Drop;
    }
    match CodecFamily::detect(&track.codec) {
        Some(family) if family == codec.into() => TrackAction::PassThrough,
        _ => TrackAction::ReEncode(codec),
    }
}

/// Built-in action for a video track.
pub fn default_video_action(track: &TrackDescriptor, target: &ConversionTarget) -> VideoTrackAction {
    default_action(track, target, target.video_codec)
}

/// Built-in action for an audio track.
pub fn default_audio_action(track: &TrackDescriptor, target: &ConversionTarget) -> AudioTrackAction {
    default_action(track, target, target.audio_codec)
}

/// Caller overrides for each track kind.
#[derive(Clone, Default)]
pub struct TrackResolvers {
    pub video: Option<Arc<dyn TrackResolver<VideoCodec>>>,
    pub audio: Option<Arc<dyn TrackResolver<AudioCodec>>>,
}

impl TrackResolvers {
    /// Decides the action for a video track, consulting the override first.
    pub fn resolve_video(
        &self,
        track: &TrackDescriptor,
        target: &ConversionTarget,
    ) -> Result<VideoTrackAction, ConvertError> {
        let action = default_video_action(track, target);
        let action = match &self.video {
            Some(resolver) => resolver.resolve(track, action),
            None => action,
        };
        if let TrackAction::ReEncode(codec) = action {
            if !codec.is_supported_target() {
                return Err(ConvertError::validation(format!(
                    "video track {} cannot be re-encoded to {}",
                    track.track_id, codec
                )));
            }
        }
        Ok(action)
    }

    /// Decides the action for an audio track, consulting the override first.
    pub fn resolve_audio(
        &self,
        track: &TrackDescriptor,
        target: &ConversionTarget,
    ) -> Result<AudioTrackAction, ConvertError> {
        let action = default_audio_action(track, target);
        let action = match &self.audio {
            Some(resolver) => resolver.resolve(track, action),
            None => action,
        };
        if let TrackAction::ReEncode(codec) = action {
            if !codec.is_supported_target() {
                return Err(ConvertError::validation(format!(
                    "audio track {} cannot be re-encoded to {}",
                    track.track_id, codec
                )));
            }
        }
        Ok(action)
    }

    /// Whether any override is installed for `kind`.
    pub fn has_override(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Video => self.video.is_some(),
            TrackKind::Audio => self.audio.is_some(),
        }
    }
}
