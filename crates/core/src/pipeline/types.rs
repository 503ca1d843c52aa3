//! Types for the track pipeline.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::media::{AudioData, CodedSample, TrackDescriptor, TrackKind, VideoFrame};

/// Decoded media of one track kind.
pub trait MediaFrame: Send + 'static {
    const KIND: TrackKind;
}

impl MediaFrame for VideoFrame {
    const KIND: TrackKind = TrackKind::Video;
}

impl MediaFrame for AudioData {
    const KIND: TrackKind = TrackKind::Audio;
}

/// What happened to one source track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track_id: u32,
    pub kind: TrackKind,
    pub source_codec: String,
    /// "reencode", "passthrough" or "drop".
    pub action: String,
    /// Codec string of the output track, if the track was kept.
    pub output_codec: Option<String>,
    /// Track number in the output, if the track was kept.
    pub output_track: Option<u32>,
    pub samples_received: u64,
    pub frames_decoded: u64,
    pub chunks_written: u64,
}

impl TrackSummary {
    pub fn new(track: &TrackDescriptor, action: &str) -> Self {
        Self {
            track_id: track.track_id,
            kind: track.kind(),
            source_codec: track.codec.clone(),
            action: action.to_string(),
            output_codec: None,
            output_track: None,
            samples_received: 0,
            frames_decoded: 0,
            chunks_written: 0,
        }
    }
}

/// A sample in flight from the parser to a pipeline. The pipeline answers on
/// `ack` once the sample has been fully processed.
#[derive(Debug)]
pub struct SampleEnvelope {
    pub sample: CodedSample,
    pub ack: oneshot::Sender<()>,
}
