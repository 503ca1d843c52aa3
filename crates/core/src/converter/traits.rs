//! Caller extension points of a conversion.

use async_trait::async_trait;

use super::types::TrackAction;
use crate::media::TrackDescriptor;

/// Overrides the action taken for a track of one kind.
///
/// Consulted exactly once per track, before any sample of that track is
/// processed. `default_action` is what the built-in policy would do.
pub trait TrackResolver<C>: Send + Sync {
    fn resolve(&self, track: &TrackDescriptor, default_action: TrackAction<C>) -> TrackAction<C>;
}

impl<C, F> TrackResolver<C> for F
where
    F: Fn(&TrackDescriptor, TrackAction<C>) -> TrackAction<C> + Send + Sync,
{
    fn resolve(&self, track: &TrackDescriptor, default_action: TrackAction<C>) -> TrackAction<C> {
        self(track, default_action)
    }
}

/// Inspects or replaces every decoded frame of a re-encoded track before it
/// is encoded. An error aborts the conversion.
#[async_trait]
pub trait FrameHook<F: Send + 'static>: Send + Sync {
    async fn on_frame(&self, frame: F, track: &TrackDescriptor) -> anyhow::Result<F>;
}

/// Receives the source duration once the parser knows it.
pub trait DurationObserver: Send + Sync {
    fn on_duration(&self, seconds: f64);
}

impl<F> DurationObserver for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_duration(&self, seconds: f64) {
        self(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{AudioCodec, VideoCodec};
    use crate::media::VideoFrame;
    use bytes::Bytes;

    #[test]
    fn test_closure_resolver() {
        let drop_small = |track: &TrackDescriptor, default_action: TrackAction<VideoCodec>| {
            match track.dimensions() {
                Some((w, _)) if w < 320 => TrackAction::Drop,
                _ => default_action,
            }
        };

        let small = TrackDescriptor::video(1, "avc1.42001f", 160, 120);
        let large = TrackDescriptor::video(2, "avc1.42001f", 1920, 1080);
        let default_action = TrackAction::ReEncode(VideoCodec::Vp8);

        assert_eq!(drop_small.resolve(&small, default_action), TrackAction::Drop);
        assert_eq!(drop_small.resolve(&large, default_action), default_action);
    }

    #[test]
    fn test_closure_resolver_audio() {
        let force_copy = |_: &TrackDescriptor, _: TrackAction<AudioCodec>| -> TrackAction<AudioCodec> {
            TrackAction::PassThrough
        };
        let track = TrackDescriptor::audio(2, "mp4a.40.2", 44100, 2);
        assert_eq!(
            force_copy.resolve(&track, TrackAction::ReEncode(AudioCodec::Opus)),
            TrackAction::PassThrough
        );
    }

    struct Darken;

    #[async_trait]
    impl FrameHook<VideoFrame> for Darken {
        async fn on_frame(
            &self,
            mut frame: VideoFrame,
            _track: &TrackDescriptor,
        ) -> anyhow::Result<VideoFrame> {
            frame.data = Bytes::from(vec![0u8; frame.data.len()]);
            Ok(frame)
        }
    }

    #[tokio::test]
    async fn test_frame_hook_replaces_frame() {
        let track = TrackDescriptor::video(1, "vp8", 2, 2);
        let frame = VideoFrame {
            timestamp_us: 0,
            duration_us: 33_333,
            width: 2,
            height: 2,
            data: Bytes::from_static(&[255, 255, 255, 255]),
        };
        let out = Darken.on_frame(frame, &track).await.unwrap();
        assert_eq!(out.data.as_ref(), &[0, 0, 0, 0]);
    }
}
