//! Wiring between the parser and the track pipelines.

use futures::future::{self, BoxFuture, FutureExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::ParseError;
use crate::converter::{
    AbortController, ConversionTarget, ConvertError, DurationObserver, FrameHook, TrackAction,
    TrackResolvers,
};
use crate::media::{CodedSample, TrackDescriptor, TrackKind, VideoFrame};
use crate::metrics;
use crate::pipeline::{
    run_audio_track, run_video_track, PipelineContext, SampleEnvelope, TrackSummary,
};

/// A running or finished track pipeline.
pub type PipelineFuture = BoxFuture<'static, Result<TrackSummary, ConvertError>>;

/// Everything the router needs to build pipelines for one conversion.
pub struct RouterSetup {
    pub pipeline: PipelineContext,
    pub abort: Arc<AbortController>,
    pub target: ConversionTarget,
    pub resolvers: TrackResolvers,
    pub frame_hook: Option<Arc<dyn FrameHook<VideoFrame>>>,
    pub audio_bitrate: u32,
    pub duration_observer: Option<Arc<dyn DurationObserver>>,
}

/// Receives track reports from the parser and creates one pipeline per
/// track.
///
/// The action for each track is decided here, once, before the parser gets
/// a sink for it.
pub struct TrackRouter {
    setup: RouterSetup,
    seen: HashSet<u32>,
    pipelines: mpsc::UnboundedSender<PipelineFuture>,
}

impl TrackRouter {
    pub fn new(setup: RouterSetup, pipelines: mpsc::UnboundedSender<PipelineFuture>) -> Self {
        Self {
            setup,
            seen: HashSet::new(),
            pipelines,
        }
    }

    /// Reports a video track and returns the sink for its samples.
    pub fn on_video_track(&mut self, track: TrackDescriptor) -> Result<SampleSink, ParseError> {
        self.register(&track, TrackKind::Video)?;

        let action = self
            .setup
            .resolvers
            .resolve_video(&track, &self.setup.target)
            .map_err(|e| self.fail(e))?;
        self.log_action(&track, action.label());

        if matches!(action, TrackAction::Drop) {
            return self.dropped(track);
        }

        let (tx, rx) = mpsc::channel(1);
        let track_id = track.track_id;
        let pipeline = run_video_track(
            self.setup.pipeline.clone(),
            track,
            action,
            self.setup.frame_hook.clone(),
            rx,
        );
        self.submit(pipeline.boxed())?;
        Ok(SampleSink::new(track_id, tx, self.cancellation()))
    }

    /// Reports an audio track and returns the sink for its samples.
    pub fn on_audio_track(&mut self, track: TrackDescriptor) -> Result<SampleSink, ParseError> {
        self.register(&track, TrackKind::Audio)?;

        let action = self
            .setup
            .resolvers
            .resolve_audio(&track, &self.setup.target)
            .map_err(|e| self.fail(e))?;
        self.log_action(&track, action.label());

        if matches!(action, TrackAction::Drop) {
            return self.dropped(track);
        }

        let (tx, rx) = mpsc::channel(1);
        let track_id = track.track_id;
        let pipeline = run_audio_track(
            self.setup.pipeline.clone(),
            track,
            action,
            self.setup.audio_bitrate,
            rx,
        );
        self.submit(pipeline.boxed())?;
        Ok(SampleSink::new(track_id, tx, self.cancellation()))
    }

    /// Reports the source duration.
    pub fn on_duration(&mut self, seconds: f64) {
        debug!(
            "Conversion {}: source duration {:.3}s",
            self.setup.pipeline.conversion_id, seconds
        );
        if let Some(observer) = &self.setup.duration_observer {
            if !self.setup.abort.is_aborted() {
                observer.on_duration(seconds);
            }
        }
    }

    /// Whether the conversion is stopping.
    pub fn is_cancelled(&self) -> bool {
        self.setup.abort.is_aborted()
    }

    fn cancellation(&self) -> CancellationToken {
        self.setup.pipeline.cancel.clone()
    }

    fn register(&mut self, track: &TrackDescriptor, expected: TrackKind) -> Result<(), ParseError> {
        if self.setup.abort.is_aborted() {
            return Err(ParseError::aborted("conversion is stopping"));
        }
        if track.kind() != expected {
            return Err(ParseError::KindMismatch {
                track_id: track.track_id,
                expected: expected.to_string(),
            });
        }
        if !self.seen.insert(track.track_id) {
            return Err(ParseError::DuplicateTrack {
                track_id: track.track_id,
            });
        }
        Ok(())
    }

    fn log_action(&self, track: &TrackDescriptor, action: &str) {
        metrics::TRACK_ACTIONS
            .with_label_values(&[track.kind().as_str(), action])
            .inc();
        info!(
            "Conversion {}: {} track {} ({}) -> {}{}",
            self.setup.pipeline.conversion_id,
            track.kind(),
            track.track_id,
            track.codec,
            action,
            if self.setup.resolvers.has_override(track.kind()) {
                " (caller resolver)"
            } else {
                ""
            }
        );
    }

    /// Records a resolver failure as the conversion's error.
    fn fail(&self, error: ConvertError) -> ParseError {
        let reason = error.to_string();
        self.setup.abort.abort(error);
        ParseError::aborted(reason)
    }

    fn dropped(&self, track: TrackDescriptor) -> Result<SampleSink, ParseError> {
        let summary = TrackSummary::new(&track, "drop");
        self.submit(future::ready(Ok(summary)).boxed())?;
        Ok(SampleSink::discarding(track.track_id, self.cancellation()))
    }

    fn submit(&self, pipeline: PipelineFuture) -> Result<(), ParseError> {
        self.pipelines
            .send(pipeline)
            .map_err(|_| ParseError::aborted("conversion no longer accepts tracks"))
    }
}

/// Where the parser delivers the coded samples of one track.
///
/// `send` resolves once the pipeline has fully processed the sample, so at
/// most one sample per track is in flight. Dropping the sink or calling
/// [`finish`](Self::finish) ends the track.
#[derive(Debug)]
pub struct SampleSink {
    track_id: u32,
    tx: Option<mpsc::Sender<SampleEnvelope>>,
    cancel: CancellationToken,
}

impl SampleSink {
    fn new(track_id: u32, tx: mpsc::Sender<SampleEnvelope>, cancel: CancellationToken) -> Self {
        Self {
            track_id,
            tx: Some(tx),
            cancel,
        }
    }

    /// A sink for a dropped track. Samples are ignored.
    fn discarding(track_id: u32, cancel: CancellationToken) -> Self {
        Self {
            track_id,
            tx: None,
            cancel,
        }
    }

    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    /// Whether samples sent here are ignored.
    pub fn is_discarding(&self) -> bool {
        self.tx.is_none()
    }

    /// Delivers one sample and waits until the pipeline is done with it.
    pub async fn send(&self, sample: CodedSample) -> Result<(), ParseError> {
        if self.cancel.is_cancelled() {
            return Err(ParseError::aborted("conversion is stopping"));
        }
        let Some(tx) = &self.tx else {
            return Ok(());
        };

        let (ack, done) = oneshot::channel();
        tx.send(SampleEnvelope { sample, ack })
            .await
            .map_err(|_| ParseError::aborted(format!("track {} stopped", self.track_id)))?;
        done.await
            .map_err(|_| ParseError::aborted(format!("track {} stopped", self.track_id)))
    }

    /// Ends the track.
    pub fn finish(self) {}
}
