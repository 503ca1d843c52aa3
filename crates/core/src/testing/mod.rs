//! Testing utilities and mock implementations of the conversion seams.
//!
//! The mocks stand in for the container parser, the codecs and the output
//! writer, so the coordinator can be driven end to end without real media.
//!
//! # Example
//!
//! ```rust,ignore
//! use webconvert_core::testing::{fixtures, MockCodecFactory, MockParser, MockWriterFactory};
//!
//! let parser = MockParser::new();
//! parser.add_track(fixtures::vp8_track(1), fixtures::video_samples(1, 10)).await;
//!
//! let codecs = MockCodecFactory::new();
//! let writers = MockWriterFactory::new();
//!
//! // Build a Converter from the three...
//! ```

mod mock_codec;
mod mock_parser;
mod mock_writer;

pub use mock_codec::{CodecCalls, MockCodecFactory};
pub use mock_parser::{MockParser, MockTrack, RecordedParse};
pub use mock_writer::{MockWriter, MockWriterFactory, WriterLog};

/// Test fixtures and helper functions.
pub mod fixtures {
    use bytes::Bytes;

    use crate::media::{CodedSample, TrackDescriptor};

    /// Duration of one video sample at 30 fps, in microseconds.
    pub const VIDEO_SAMPLE_US: u64 = 33_333;

    /// Duration of one audio packet, in microseconds.
    pub const AUDIO_SAMPLE_US: u64 = 20_000;

    /// A 640x360 VP8 video track.
    pub fn vp8_track(track_id: u32) -> TrackDescriptor {
        TrackDescriptor::video(track_id, "vp8", 640, 360)
    }

    /// A 1280x720 VP9 video track.
    pub fn vp9_track(track_id: u32) -> TrackDescriptor {
        TrackDescriptor::video(track_id, "vp09.00.10.08", 1280, 720)
    }

    /// A 1920x1080 H.264 video track.
    pub fn h264_track(track_id: u32) -> TrackDescriptor {
        TrackDescriptor::video(track_id, "avc1.64001f", 1920, 1080)
    }

    /// A 48 kHz stereo Opus track.
    pub fn opus_track(track_id: u32) -> TrackDescriptor {
        TrackDescriptor::audio(track_id, "opus", 48_000, 2)
    }

    /// A 44.1 kHz stereo AAC track.
    pub fn aac_track(track_id: u32) -> TrackDescriptor {
        TrackDescriptor::audio(track_id, "mp4a.40.2", 44_100, 2)
    }

    /// `count` consecutive video samples; every 10th one is a key frame.
    pub fn video_samples(track_id: u32, count: usize) -> Vec<CodedSample> {
        (0..count as u64)
            .map(|i| CodedSample {
                track_id,
                timestamp_us: i * VIDEO_SAMPLE_US,
                duration_us: VIDEO_SAMPLE_US,
                key: i % 10 == 0,
                data: Bytes::from(vec![(i % 251) as u8; 64]),
            })
            .collect()
    }

    /// `count` consecutive audio packets.
    pub fn audio_samples(track_id: u32, count: usize) -> Vec<CodedSample> {
        (0..count as u64)
            .map(|i| CodedSample {
                track_id,
                timestamp_us: i * AUDIO_SAMPLE_US,
                duration_us: AUDIO_SAMPLE_US,
                key: true,
                data: Bytes::from(vec![(i % 251) as u8; 16]),
            })
            .collect()
    }
}
