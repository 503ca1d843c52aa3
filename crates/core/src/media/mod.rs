//! Media primitives shared by the parser, codec, pipeline and writer seams.

mod types;

pub use types::{
    AudioData, CodedSample, Source, TrackDescriptor, TrackKind, TrackParams, VideoFrame,
};
