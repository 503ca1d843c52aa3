//! Per-track decode, transform, encode and write loop.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::types::{MediaFrame, SampleEnvelope, TrackSummary};
use crate::codec::{AudioEncoderConfig, CodecFactory, Decoder, Encoder, VideoEncoderConfig};
use crate::converter::{
    AudioTrackAction, ConvertError, FrameHook, ProgressTracker, TrackAction, VideoTrackAction,
};
use crate::media::{AudioData, CodedSample, TrackDescriptor, TrackParams, VideoFrame};
use crate::writer::{OutputTrack, WriterBinding};

/// Shared handles every pipeline of a conversion receives.
#[derive(Clone)]
pub struct PipelineContext {
    pub conversion_id: Uuid,
    /// Cancelled when the conversion aborts for any reason.
    pub cancel: CancellationToken,
    /// The caller's own cancellation token.
    pub caller: CancellationToken,
    pub progress: Arc<ProgressTracker>,
    pub writer: Arc<WriterBinding>,
    pub codecs: Arc<dyn CodecFactory>,
}

impl PipelineContext {
    fn ensure_active(&self, stage: &str) -> Result<(), ConvertError> {
        if self.caller.is_cancelled() {
            Err(ConvertError::AbortedByCaller)
        } else if self.cancel.is_cancelled() {
            Err(ConvertError::aborted_internally(format!(
                "cancelled {}",
                stage
            )))
        } else {
            Ok(())
        }
    }
}

struct Transcoder<F: MediaFrame> {
    decoder: Box<dyn Decoder<F>>,
    encoder: Box<dyn Encoder<F>>,
    hook: Option<Arc<dyn FrameHook<F>>>,
}

/// Write side of a pipeline: counts, checks cancellation and hands chunks to
/// the writer under the output track number.
struct TrackOutput<F: MediaFrame> {
    ctx: PipelineContext,
    output_track: u32,
    summary: TrackSummary,
    _frame: std::marker::PhantomData<fn() -> F>,
}

impl<F: MediaFrame> TrackOutput<F> {
    fn frame_decoded(&mut self) {
        self.ctx.progress.frame_decoded(F::KIND);
        self.summary.frames_decoded += 1;
    }

    async fn emit(&mut self, chunks: Vec<CodedSample>) -> Result<(), ConvertError> {
        for mut chunk in chunks {
            self.ctx.ensure_active("after encode")?;
            self.ctx.progress.chunk_encoded(F::KIND);
            // The observer may have cancelled.
            self.ctx.ensure_active("before write")?;
            chunk.track_id = self.output_track;
            self.ctx.writer.write(chunk).await?;
            self.summary.chunks_written += 1;
        }
        Ok(())
    }
}

/// Pipeline of one kept track.
pub struct TrackPipeline<F: MediaFrame> {
    track: TrackDescriptor,
    transcoder: Option<Transcoder<F>>,
    output: TrackOutput<F>,
}

impl<F: MediaFrame> TrackPipeline<F> {
    /// Consumes samples until the sink is finished, then flushes.
    pub async fn run(
        mut self,
        mut samples: mpsc::Receiver<SampleEnvelope>,
    ) -> Result<TrackSummary, ConvertError> {
        debug!(
            "Conversion {}: {} track {} running ({})",
            self.output.ctx.conversion_id, F::KIND, self.track.track_id, self.output.summary.action
        );

        loop {
            self.output.ctx.ensure_active("before next sample")?;
            let Some(SampleEnvelope { sample, ack }) = samples.recv().await else {
                break;
            };
            self.output.summary.samples_received += 1;
            self.process(sample).await?;
            // The parser may have stopped waiting; nothing to do then.
            let _ = ack.send(());
        }

        self.flush().await?;

        debug!(
            "Conversion {}: {} track {} done, {} samples in, {} chunks out",
            self.output.ctx.conversion_id,
            F::KIND,
            self.track.track_id,
            self.output.summary.samples_received,
            self.output.summary.chunks_written
        );
        Ok(self.output.summary)
    }

    async fn process(&mut self, sample: CodedSample) -> Result<(), ConvertError> {
        match self.transcoder.as_mut() {
            None => self.output.emit(vec![sample]).await,
            Some(transcoder) => {
                let frames = transcoder.decoder.decode(sample).await?;
                encode_frames(transcoder, &mut self.output, &self.track, frames).await
            }
        }
    }

    async fn flush(&mut self) -> Result<(), ConvertError> {
        let Some(transcoder) = self.transcoder.as_mut() else {
            return Ok(());
        };
        self.output.ctx.ensure_active("before flush")?;
        let frames = transcoder.decoder.flush().await?;
        encode_frames(transcoder, &mut self.output, &self.track, frames).await?;
        self.output.ctx.ensure_active("before encoder flush")?;
        let chunks = transcoder.encoder.flush().await?;
        self.output.emit(chunks).await
    }
}

async fn encode_frames<F: MediaFrame>(
    transcoder: &mut Transcoder<F>,
    output: &mut TrackOutput<F>,
    track: &TrackDescriptor,
    frames: Vec<F>,
) -> Result<(), ConvertError> {
    for frame in frames {
        output.ctx.ensure_active("after decode")?;
        output.frame_decoded();
        let frame = match &transcoder.hook {
            Some(hook) => hook
                .on_frame(frame, track)
                .await
                .map_err(|e| ConvertError::frame_hook(track.track_id, e))?,
            None => frame,
        };
        output.ctx.ensure_active("between decode and encode")?;
        let chunks = transcoder.encoder.encode(frame).await?;
        output.emit(chunks).await?;
    }
    Ok(())
}

async fn start<F: MediaFrame>(
    ctx: PipelineContext,
    track: TrackDescriptor,
    output_track: OutputTrack,
    transcoder: Option<Transcoder<F>>,
    mut summary: TrackSummary,
    samples: mpsc::Receiver<SampleEnvelope>,
) -> Result<TrackSummary, ConvertError> {
    summary.output_codec = Some(output_track.codec.clone());
    let number = ctx.writer.add_track(output_track).await?;
    summary.output_track = Some(number);

    let pipeline = TrackPipeline {
        track,
        transcoder,
        output: TrackOutput {
            ctx,
            output_track: number,
            summary,
            _frame: std::marker::PhantomData,
        },
    };
    pipeline.run(samples).await
}

/// Sets up and runs the pipeline of a video track.
pub async fn run_video_track(
    ctx: PipelineContext,
    track: TrackDescriptor,
    action: VideoTrackAction,
    hook: Option<Arc<dyn FrameHook<VideoFrame>>>,
    samples: mpsc::Receiver<SampleEnvelope>,
) -> Result<TrackSummary, ConvertError> {
    ctx.ensure_active("before track setup")?;
    let summary = TrackSummary::new(&track, action.label());

    let (output_track, transcoder) = match action {
        TrackAction::Drop => return Ok(summary),
        TrackAction::PassThrough => (passthrough_output(&track), None),
        TrackAction::ReEncode(codec) => {
            let TrackParams::Video { width, height } = track.params else {
                return Err(ConvertError::aborted_internally(format!(
                    "track {} is not a video track",
                    track.track_id
                )));
            };
            let decoder = ctx.codecs.video_decoder(&track).await?;
            let encoder = ctx
                .codecs
                .video_encoder(&VideoEncoderConfig {
                    codec,
                    width,
                    height,
                })
                .await?;
            let output = OutputTrack {
                kind: track.kind(),
                codec: codec.codec_string().to_string(),
                timescale: track.timescale,
                params: TrackParams::Video { width, height },
            };
            (
                output,
                Some(Transcoder {
                    decoder,
                    encoder,
                    hook,
                }),
            )
        }
    };

    start(ctx, track, output_track, transcoder, summary, samples).await
}

/// Sets up and runs the pipeline of an audio track.
pub async fn run_audio_track(
    ctx: PipelineContext,
    track: TrackDescriptor,
    action: AudioTrackAction,
    bitrate: u32,
    samples: mpsc::Receiver<SampleEnvelope>,
) -> Result<TrackSummary, ConvertError> {
    ctx.ensure_active("before track setup")?;
    let summary = TrackSummary::new(&track, action.label());

    let (output_track, transcoder) = match action {
        TrackAction::Drop => return Ok(summary),
        TrackAction::PassThrough => (passthrough_output(&track), None),
        TrackAction::ReEncode(codec) => {
            let TrackParams::Audio {
                sample_rate,
                channels,
            } = track.params
            else {
                return Err(ConvertError::aborted_internally(format!(
                    "track {} is not an audio track",
                    track.track_id
                )));
            };
            let decoder = ctx.codecs.audio_decoder(&track).await?;
            let encoder = ctx
                .codecs
                .audio_encoder(&AudioEncoderConfig {
                    codec,
                    bitrate,
                    sample_rate,
                    channels,
                })
                .await?;
            let output = OutputTrack {
                kind: track.kind(),
                codec: codec.codec_string().to_string(),
                timescale: track.timescale,
                params: TrackParams::Audio {
                    sample_rate,
                    channels,
                },
            };
            (
                output,
                Some(Transcoder {
                    decoder,
                    encoder,
                    hook: None::<Arc<dyn FrameHook<AudioData>>>,
                }),
            )
        }
    };

    start(ctx, track, output_track, transcoder, summary, samples).await
}

fn passthrough_output(track: &TrackDescriptor) -> OutputTrack {
    OutputTrack {
        kind: track.kind(),
        codec: track.codec.clone(),
        timescale: track.timescale,
        params: track.params.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ContainerFormat, ConversionState, FnObserver, VideoCodec};
    use crate::testing::{fixtures, MockCodecFactory, MockWriterFactory};
    use crate::writer::WriterFactory;
    use async_trait::async_trait;
    use tokio::sync::oneshot;

    async fn context(codecs: &MockCodecFactory, writers: &MockWriterFactory) -> PipelineContext {
        context_with(codecs, writers, ProgressTracker::new(None)).await
    }

    async fn context_with(
        codecs: &MockCodecFactory,
        writers: &MockWriterFactory,
        progress: ProgressTracker,
    ) -> PipelineContext {
        let progress = Arc::new(progress);
        let writer = writers
            .create(Uuid::new_v4(), ContainerFormat::Webm)
            .await
            .unwrap();
        PipelineContext {
            conversion_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            caller: CancellationToken::new(),
            progress: progress.clone(),
            writer: Arc::new(WriterBinding::new(writer, progress)),
            codecs: Arc::new(codecs.clone()),
        }
    }

    /// Feeds samples one at a time, waiting for each ack like a parser does.
    /// Stops early when the pipeline goes away.
    async fn feed(tx: mpsc::Sender<SampleEnvelope>, samples: Vec<CodedSample>) -> usize {
        let mut acked = 0;
        for sample in samples {
            let (ack, done) = oneshot::channel();
            if tx.send(SampleEnvelope { sample, ack }).await.is_err() || done.await.is_err() {
                break;
            }
            acked += 1;
        }
        acked
    }

    struct FailingHook;

    #[async_trait]
    impl FrameHook<VideoFrame> for FailingHook {
        async fn on_frame(&self, _frame: VideoFrame, _track: &TrackDescriptor) -> anyhow::Result<VideoFrame> {
            anyhow::bail!("bad frame")
        }
    }

    struct CancellingHook(CancellationToken);

    #[async_trait]
    impl FrameHook<VideoFrame> for CancellingHook {
        async fn on_frame(&self, frame: VideoFrame, _track: &TrackDescriptor) -> anyhow::Result<VideoFrame> {
            self.0.cancel();
            Ok(frame)
        }
    }

    #[tokio::test]
    async fn test_passthrough_skips_codecs() {
        let codecs = MockCodecFactory::new();
        let writers = MockWriterFactory::new();
        let ctx = context(&codecs, &writers).await;
        let (tx, rx) = mpsc::channel(1);

        let pipeline = tokio::spawn(run_video_track(
            ctx.clone(),
            fixtures::vp9_track(7),
            TrackAction::PassThrough,
            None,
            rx,
        ));
        assert_eq!(feed(tx, fixtures::video_samples(7, 5)).await, 5);
        let summary = pipeline.await.unwrap().unwrap();

        assert_eq!(summary.samples_received, 5);
        assert_eq!(summary.chunks_written, 5);
        assert_eq!(summary.frames_decoded, 0);
        assert_eq!(summary.output_track, Some(1));
        assert_eq!(summary.output_codec.as_deref(), Some("vp09.00.10.08"));
        assert_eq!(codecs.calls().await.codecs_created(), 0);

        let log = writers.log().await;
        assert!(log.chunks.iter().all(|c| c.track_id == 1));
        let state = ctx.progress.snapshot();
        assert_eq!(state.encoded_video_frames, 5);
        assert_eq!(state.decoded_video_frames, 0);
    }

    #[tokio::test]
    async fn test_reencode_flushes_buffered_frames() {
        let codecs = MockCodecFactory::new();
        codecs.set_hold_back(true).await;
        let writers = MockWriterFactory::new();
        let ctx = context(&codecs, &writers).await;
        let (tx, rx) = mpsc::channel(1);

        let pipeline = tokio::spawn(run_video_track(
            ctx.clone(),
            fixtures::h264_track(1),
            TrackAction::ReEncode(VideoCodec::Vp8),
            None,
            rx,
        ));
        feed(tx, fixtures::video_samples(1, 4)).await;
        let summary = pipeline.await.unwrap().unwrap();

        let calls = codecs.calls().await;
        assert_eq!(calls.video_decoded, 4);
        assert_eq!(calls.video_encoded, 4);
        assert_eq!(calls.decoder_flushes, 1);
        assert_eq!(calls.encoder_flushes, 1);
        assert_eq!(summary.frames_decoded, 4);
        assert_eq!(summary.chunks_written, 4);
        assert_eq!(summary.output_codec.as_deref(), Some("vp8"));

        let configs = codecs.recorded_video_configs().await;
        assert_eq!(configs.len(), 1);
        assert_eq!((configs[0].width, configs[0].height), (1920, 1080));

        let state = ctx.progress.snapshot();
        assert_eq!(state.decoded_video_frames, state.encoded_video_frames);
    }

    #[tokio::test]
    async fn test_frame_hook_error_fails_track() {
        let codecs = MockCodecFactory::new();
        let writers = MockWriterFactory::new();
        let ctx = context(&codecs, &writers).await;
        let (tx, rx) = mpsc::channel(1);

        let pipeline = tokio::spawn(run_video_track(
            ctx,
            fixtures::vp8_track(3),
            TrackAction::ReEncode(VideoCodec::Vp9),
            Some(Arc::new(FailingHook)),
            rx,
        ));
        assert_eq!(feed(tx, fixtures::video_samples(3, 3)).await, 0);
        let err = pipeline.await.unwrap().unwrap_err();

        match err {
            ConvertError::FrameHook { track_id, reason } => {
                assert_eq!(track_id, 3);
                assert!(reason.contains("bad frame"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(codecs.calls().await.video_encoded, 0);
        assert!(writers.log().await.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_between_decode_and_encode() {
        let codecs = MockCodecFactory::new();
        let writers = MockWriterFactory::new();
        let ctx = context(&codecs, &writers).await;
        let (tx, rx) = mpsc::channel(1);

        let pipeline = tokio::spawn(run_video_track(
            ctx.clone(),
            fixtures::vp8_track(1),
            TrackAction::ReEncode(VideoCodec::Vp8),
            Some(Arc::new(CancellingHook(ctx.cancel.clone()))),
            rx,
        ));
        feed(tx, fixtures::video_samples(1, 2)).await;
        let err = pipeline.await.unwrap().unwrap_err();

        assert!(matches!(err, ConvertError::AbortedInternally { .. }));
        let calls = codecs.calls().await;
        assert_eq!(calls.video_decoded, 1);
        assert_eq!(calls.video_encoded, 0);
        assert!(writers.log().await.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_setup_adds_no_track() {
        let codecs = MockCodecFactory::new();
        let writers = MockWriterFactory::new();
        let ctx = context(&codecs, &writers).await;
        ctx.cancel.cancel();
        let (_tx, rx) = mpsc::channel(1);

        let result = run_audio_track(
            ctx,
            fixtures::aac_track(2),
            TrackAction::ReEncode(crate::converter::AudioCodec::Opus),
            128_000,
            rx,
        )
        .await;

        assert!(result.is_err());
        assert!(writers.log().await.tracks.is_empty());
        assert_eq!(codecs.calls().await.codecs_created(), 0);
    }

    #[tokio::test]
    async fn test_no_progress_after_caller_cancel_during_flush() {
        let codecs = MockCodecFactory::new();
        codecs.set_hold_back(true).await;
        let writers = MockWriterFactory::new();
        let caller = CancellationToken::new();

        // Cancels once the first bytes reach the writer, then counts calls.
        let calls_after_cancel = Arc::new(std::sync::Mutex::new(None::<usize>));
        let observer_calls = calls_after_cancel.clone();
        let observer_token = caller.clone();
        let observer = FnObserver(move |state: &ConversionState| {
            let mut calls = observer_calls.lock().unwrap();
            match calls.as_mut() {
                Some(after) => *after += 1,
                None if state.bytes_written > 0 => {
                    observer_token.cancel();
                    *calls = Some(0);
                }
                None => {}
            }
        });
        let mut ctx =
            context_with(&codecs, &writers, ProgressTracker::new(Some(Arc::new(observer)))).await;
        ctx.caller = caller;
        let (tx, rx) = mpsc::channel(1);

        let pipeline = tokio::spawn(run_video_track(
            ctx.clone(),
            fixtures::h264_track(1),
            TrackAction::ReEncode(VideoCodec::Vp8),
            None,
            rx,
        ));
        assert_eq!(feed(tx, fixtures::video_samples(1, 2)).await, 2);
        let err = pipeline.await.unwrap().unwrap_err();

        assert!(matches!(err, ConvertError::AbortedByCaller));
        assert_eq!(*calls_after_cancel.lock().unwrap(), Some(0));
        assert_eq!(codecs.calls().await.encoder_flushes, 0);
        assert_eq!(writers.log().await.chunks.len(), 1);
        assert_eq!(ctx.progress.snapshot().encoded_video_frames, 1);
    }
}
