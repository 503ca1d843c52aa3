//! Target formats and per-track actions for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::media::TrackKind;

/// Container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    /// WebM (Matroska subset)
    Webm,
    /// MPEG-4 Part 14 (.mp4)
    Mp4,
    /// Matroska (.mkv)
    Mkv,
    /// Audio Video Interleave (.avi)
    Avi,
}

impl ContainerFormat {
    /// Returns the file extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
        }
    }

    /// Whether this container can carry tracks of the given kind.
    pub fn can_carry(&self, kind: TrackKind) -> bool {
        match (self, kind) {
            (Self::Webm | Self::Mp4 | Self::Mkv | Self::Avi, TrackKind::Video) => true,
            (Self::Webm | Self::Mp4 | Self::Mkv | Self::Avi, TrackKind::Audio) => true,
        }
    }

    /// Whether conversions into this container are supported.
    pub fn is_supported_target(&self) -> bool {
        matches!(self, Self::Webm)
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// VP8
    Vp8,
    /// VP9
    Vp9,
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// AV1
    Av1,
}

impl VideoCodec {
    /// Short codec name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::H264 => "h264",
            Self::H265 => "h265",
            Self::Av1 => "av1",
        }
    }

    /// Codec string written into the output track.
    pub fn codec_string(&self) -> &'static str {
        match self {
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp09.00.10.08",
            Self::H264 => "avc1.42001f",
            Self::H265 => "hvc1.1.6.L93.B0",
            Self::Av1 => "av01.0.04M.08",
        }
    }

    /// Whether this codec may be requested as a conversion target.
    pub fn is_supported_target(&self) -> bool {
        matches!(self, Self::Vp8 | Self::Vp9)
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// Opus
    Opus,
    /// Advanced Audio Coding
    Aac,
    /// MPEG Audio Layer III
    Mp3,
    /// Vorbis
    Vorbis,
    /// Free Lossless Audio Codec
    Flac,
}

impl AudioCodec {
    /// Short codec name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Vorbis => "vorbis",
            Self::Flac => "flac",
        }
    }

    /// Codec string written into the output track.
    pub fn codec_string(&self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Aac => "mp4a.40.2",
            Self::Mp3 => "mp3",
            Self::Vorbis => "vorbis",
            Self::Flac => "flac",
        }
    }

    /// Whether this codec may be requested as a conversion target.
    pub fn is_supported_target(&self) -> bool {
        matches!(self, Self::Opus)
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target of a conversion: one container plus the codec for each track kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionTarget {
    pub container: ContainerFormat,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
}

impl Default for ConversionTarget {
    fn default() -> Self {
        Self {
            container: ContainerFormat::Webm,
            video_codec: VideoCodec::Vp8,
            audio_codec: AudioCodec::Opus,
        }
    }
}

/// What to do with one track. Decided once, before any sample is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "codec", rename_all = "snake_case")]
pub enum TrackAction<C> {
    /// Decode and encode into the given codec.
    ReEncode(C),
    /// Copy coded samples into the output unchanged.
    PassThrough,
    /// Leave the track out of the output.
    Drop,
}

impl<C> TrackAction<C> {
    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReEncode(_) => "reencode",
            Self::PassThrough => "passthrough",
            Self::Drop => "drop",
        }
    }
}

/// Action for a video track.
pub type VideoTrackAction = TrackAction<VideoCodec>;

/// Action for an audio track.
pub type AudioTrackAction = TrackAction<AudioCodec>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_extension() {
        assert_eq!(ContainerFormat::Webm.extension(), "webm");
        assert_eq!(ContainerFormat::Mp4.extension(), "mp4");
        assert_eq!(ContainerFormat::Avi.to_string(), "avi");
    }

    #[test]
    fn test_supported_targets() {
        assert!(ContainerFormat::Webm.is_supported_target());
        assert!(!ContainerFormat::Mp4.is_supported_target());
        assert!(VideoCodec::Vp8.is_supported_target());
        assert!(VideoCodec::Vp9.is_supported_target());
        assert!(!VideoCodec::H264.is_supported_target());
        assert!(AudioCodec::Opus.is_supported_target());
        assert!(!AudioCodec::Aac.is_supported_target());
    }

    #[test]
    fn test_track_action_label() {
        assert_eq!(VideoTrackAction::ReEncode(VideoCodec::Vp9).label(), "reencode");
        assert_eq!(AudioTrackAction::PassThrough.label(), "passthrough");
        assert_eq!(AudioTrackAction::Drop.label(), "drop");
    }

    #[test]
    fn test_track_action_serialization() {
        let action = VideoTrackAction::ReEncode(VideoCodec::Vp9);
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"action":"re_encode","codec":"vp9"}"#);
        let parsed: VideoTrackAction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, action);
    }
}
