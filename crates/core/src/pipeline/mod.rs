//! Track pipelines.
//!
//! One pipeline runs per kept track. It pulls coded samples from the
//! parser's sink one at a time, decodes, optionally hands frames to the
//! caller's hook, encodes and writes, or forwards samples unchanged when the
//! track is passed through.

mod track;
mod types;

pub use track::{run_audio_track, run_video_track, PipelineContext, TrackPipeline};
pub use types::{MediaFrame, SampleEnvelope, TrackSummary};
