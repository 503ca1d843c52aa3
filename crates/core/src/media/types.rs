//! Types describing source media: tracks, coded samples and decoded frames.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::converter::ContainerFormat;

/// Kind of a media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific parameters of a source track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackParams {
    Video {
        /// Coded width in pixels.
        width: u32,
        /// Coded height in pixels.
        height: u32,
    },
    Audio {
        /// Sample rate in Hz.
        sample_rate: u32,
        /// Number of channels.
        channels: u8,
    },
}

/// A track discovered by the container parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Track id as stored in the source container.
    pub track_id: u32,
    /// Source codec string (e.g. "vp8", "vp09.00.10.08", "avc1.64001f", "opus").
    pub codec: String,
    /// Timescale of the source track (units per second).
    pub timescale: u32,
    /// Kind-specific parameters.
    pub params: TrackParams,
}

impl TrackDescriptor {
    /// Creates a video track descriptor.
    pub fn video(track_id: u32, codec: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            track_id,
            codec: codec.into(),
            timescale: 90_000,
            params: TrackParams::Video { width, height },
        }
    }

    /// Creates an audio track descriptor.
    pub fn audio(track_id: u32, codec: impl Into<String>, sample_rate: u32, channels: u8) -> Self {
        Self {
            track_id,
            codec: codec.into(),
            timescale: sample_rate,
            params: TrackParams::Audio {
                sample_rate,
                channels,
            },
        }
    }

    /// Returns the kind of this track.
    pub fn kind(&self) -> TrackKind {
        match self.params {
            TrackParams::Video { .. } => TrackKind::Video,
            TrackParams::Audio { .. } => TrackKind::Audio,
        }
    }

    /// Video dimensions, if this is a video track.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.params {
            TrackParams::Video { width, height } => Some((width, height)),
            TrackParams::Audio { .. } => None,
        }
    }

    /// Sample rate and channel count, if this is an audio track.
    pub fn audio_format(&self) -> Option<(u32, u8)> {
        match self.params {
            TrackParams::Audio {
                sample_rate,
                channels,
            } => Some((sample_rate, channels)),
            TrackParams::Video { .. } => None,
        }
    }
}

/// A compressed unit of media, as read from the source or produced by an encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct CodedSample {
    /// Track the sample belongs to. Re-tagged with the output track number
    /// before it reaches the writer.
    pub track_id: u32,
    /// Presentation timestamp in microseconds.
    pub timestamp_us: u64,
    /// Duration in microseconds.
    pub duration_us: u64,
    /// Whether this is a key frame / sync sample.
    pub key: bool,
    /// Compressed payload.
    pub data: Bytes,
}

impl CodedSample {
    /// End of this sample on the media timeline, in milliseconds.
    pub fn end_ms(&self) -> u64 {
        (self.timestamp_us + self.duration_us) / 1000
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A decoded video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub timestamp_us: u64,
    pub duration_us: u64,
    pub width: u32,
    pub height: u32,
    /// Raw pixel data; layout is owned by the codec implementation.
    pub data: Bytes,
}

/// A block of decoded audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    pub timestamp_us: u64,
    pub duration_us: u64,
    pub sample_rate: u32,
    pub channels: u8,
    /// Number of frames (samples per channel) in `data`.
    pub frames: u32,
    /// Raw sample data; layout is owned by the codec implementation.
    pub data: Bytes,
}

/// Where the source media comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A local file.
    Path(PathBuf),
    /// A remote URL, fetched by the parser.
    Url(String),
    /// An in-memory buffer.
    Bytes(Bytes),
}

impl Source {
    /// Human readable name for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }

    /// Guesses the source container from the file extension.
    ///
    /// Matroska files are treated as WebM. Anything unrecognised is assumed to
    /// be MP4. In-memory sources carry no name and are reported as `None`.
    pub fn guess_container(&self) -> Option<ContainerFormat> {
        let name = match self {
            Self::Path(path) => path.to_string_lossy().to_string(),
            Self::Url(url) => url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
            Self::Bytes(_) => return None,
        };

        let extension = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        Some(match extension.as_deref() {
            Some("webm") | Some("mkv") => ContainerFormat::Webm,
            Some("avi") => ContainerFormat::Avi,
            _ => ContainerFormat::Mp4,
        })
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Bytes> for Source {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_kind() {
        let video = TrackDescriptor::video(1, "vp8", 1280, 720);
        let audio = TrackDescriptor::audio(2, "opus", 48000, 2);
        assert_eq!(video.kind(), TrackKind::Video);
        assert_eq!(audio.kind(), TrackKind::Audio);
        assert_eq!(video.dimensions(), Some((1280, 720)));
        assert_eq!(audio.dimensions(), None);
        assert_eq!(audio.audio_format(), Some((48000, 2)));
    }

    #[test]
    fn test_guess_container_from_extension() {
        assert_eq!(
            Source::Path(PathBuf::from("/videos/clip.webm")).guess_container(),
            Some(ContainerFormat::Webm)
        );
        assert_eq!(
            Source::Path(PathBuf::from("/videos/clip.MKV")).guess_container(),
            Some(ContainerFormat::Webm)
        );
        assert_eq!(
            Source::Path(PathBuf::from("/videos/clip.avi")).guess_container(),
            Some(ContainerFormat::Avi)
        );
        assert_eq!(
            Source::Path(PathBuf::from("/videos/clip.mov")).guess_container(),
            Some(ContainerFormat::Mp4)
        );
    }

    #[test]
    fn test_guess_container_url_ignores_query() {
        let source = Source::Url("https://example.com/a/video.webm?token=abc.mp4".to_string());
        assert_eq!(source.guess_container(), Some(ContainerFormat::Webm));
    }

    #[test]
    fn test_guess_container_bytes() {
        let source = Source::Bytes(Bytes::from_static(b"abc"));
        assert_eq!(source.guess_container(), None);
        assert_eq!(source.describe(), "<3 bytes in memory>");
    }

    #[test]
    fn test_sample_end_ms() {
        let sample = CodedSample {
            track_id: 1,
            timestamp_us: 40_000,
            duration_us: 33_333,
            key: true,
            data: Bytes::from_static(&[0u8; 16]),
        };
        assert_eq!(sample.end_ms(), 73);
        assert_eq!(sample.size(), 16);
    }
}
