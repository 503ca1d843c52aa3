//! Transcode coordinator.

use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::abort::{AbortController, AbortHandle};
use super::config::ConverterConfig;
use super::error::ConvertError;
use super::progress::ProgressTracker;
use super::request::ConversionRequest;
use super::result::{ConversionResult, ConversionSummary};
use crate::codec::CodecFactory;
use crate::config::Config;
use crate::metrics;
use crate::parser::{ContainerParser, ParseOptions, PipelineFuture, RouterSetup, TrackRouter};
use crate::pipeline::{PipelineContext, TrackSummary};
use crate::writer::{FinishedOutput, StorageWriterFactory, WriterBinding, WriterFactory};

/// Entry point for conversions.
///
/// Holds the parser, codec and writer implementations shared by every
/// conversion it starts. Cloning is cheap.
#[derive(Clone)]
pub struct Converter {
    parser: Arc<dyn ContainerParser>,
    codecs: Arc<dyn CodecFactory>,
    writers: Arc<dyn WriterFactory>,
    config: ConverterConfig,
}

impl Converter {
    pub fn new(
        parser: Arc<dyn ContainerParser>,
        codecs: Arc<dyn CodecFactory>,
        writers: Arc<dyn WriterFactory>,
    ) -> Self {
        Self {
            parser,
            codecs,
            writers,
            config: ConverterConfig::default(),
        }
    }

    /// Creates a converter writing through a [`StorageWriterFactory`].
    pub fn from_config(
        config: &Config,
        parser: Arc<dyn ContainerParser>,
        codecs: Arc<dyn CodecFactory>,
    ) -> Self {
        let writers = Arc::new(StorageWriterFactory::new(config.storage.clone()));
        Self::new(parser, codecs, writers).with_config(config.converter.clone())
    }

    /// Sets the encoding policy.
    pub fn with_config(mut self, config: ConverterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Checks `request` and returns a conversion that has not started yet.
    ///
    /// Nothing runs until the returned [`Conversion`] is awaited or spawned,
    /// so an [`AbortHandle`] can be taken before any outcome is possible.
    pub fn convert(&self, request: ConversionRequest) -> Result<Conversion, ConvertError> {
        if let Err(e) = request.validate() {
            warn!(
                "Rejected conversion of {}: {}",
                request.source().describe(),
                e
            );
            metrics::CONVERSIONS_TOTAL
                .with_label_values(&[e.label()])
                .inc();
            return Err(e);
        }

        Ok(Conversion {
            id: Uuid::new_v4(),
            request,
            converter: self.clone(),
            abort: Arc::new(AbortController::new()),
        })
    }
}

/// A validated conversion that runs when awaited.
#[must_use = "a conversion does nothing unless awaited or spawned"]
pub struct Conversion {
    id: Uuid,
    request: ConversionRequest,
    converter: Converter,
    abort: Arc<AbortController>,
}

impl std::fmt::Debug for Conversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversion")
            .field("id", &self.id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl Conversion {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle that stops this conversion, usable before it starts.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.handle()
    }

    /// Runs the conversion to completion. Settles exactly once.
    pub async fn run(self) -> Result<ConversionResult, ConvertError> {
        let Conversion {
            id,
            request,
            converter,
            abort,
        } = self;

        let started = Instant::now();
        let started_at = Utc::now();
        let target = request.target;
        let source_name = request.source.describe();
        info!(
            "Conversion {}: {} -> {} ({}/{})",
            id, source_name, target.container, target.video_codec, target.audio_codec
        );

        let mut tracker =
            ProgressTracker::new(request.progress_observer.clone()).stop_on(abort.token());
        if let Some(token) = &request.cancellation {
            tracker = tracker.stop_on(token.clone());
        }
        let progress = Arc::new(tracker);
        let run = Run {
            id,
            request,
            converter,
            abort,
            progress: progress.clone(),
        };
        let outcome = run.execute().await;
        progress.close();

        let elapsed = started.elapsed();
        let result_label = match &outcome {
            Ok(_) => "success",
            Err(e) => e.label(),
        };
        metrics::CONVERSIONS_TOTAL
            .with_label_values(&[result_label])
            .inc();
        metrics::CONVERSION_DURATION
            .with_label_values(&[result_label])
            .observe(elapsed.as_secs_f64());

        match outcome {
            Ok((output, mut tracks)) => {
                tracks.sort_by_key(|t| t.track_id);
                let summary = ConversionSummary {
                    conversion_id: id,
                    source: source_name,
                    target,
                    state: progress.snapshot(),
                    tracks,
                    started_at,
                    finished_at: Utc::now(),
                    duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                };
                info!(
                    "Conversion {}: completed in {}ms, {} bytes written",
                    id, summary.duration_ms, summary.state.bytes_written
                );
                Ok(ConversionResult::new(output, summary))
            }
            Err(e) if e.is_aborted() => {
                info!("Conversion {}: {}", id, e);
                Err(e)
            }
            Err(e) => {
                warn!("Conversion {} failed: {}", id, e);
                Err(e)
            }
        }
    }
}

impl IntoFuture for Conversion {
    type Output = Result<ConversionResult, ConvertError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

/// State of a conversion while it runs.
struct Run {
    id: Uuid,
    request: ConversionRequest,
    converter: Converter,
    abort: Arc<AbortController>,
    progress: Arc<ProgressTracker>,
}

type Finished = (Box<dyn FinishedOutput>, Vec<TrackSummary>);

impl Run {
    async fn execute(self) -> Result<Finished, ConvertError> {
        let external = self.request.cancellation.clone().unwrap_or_default();
        if external.is_cancelled() {
            self.abort.abort(ConvertError::AbortedByCaller);
        }
        if self.abort.is_aborted() {
            self.progress.close();
            return Err(self.take_error());
        }

        let writer = match self
            .converter
            .writers
            .create(self.id, self.request.target.container)
            .await
        {
            Ok(writer) => writer,
            Err(e) => {
                self.abort.abort(e.into());
                self.progress.close();
                return Err(self.take_error());
            }
        };
        debug!("Conversion {}: writing with {} writer", self.id, writer.name());
        let binding = Arc::new(WriterBinding::new(writer, self.progress.clone()));

        let tracks = self.drive(&external, &binding).await;
        if self.abort.is_aborted() {
            return Err(self.fail(&binding).await);
        }

        let token = self.abort.token();
        let finalized = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            _ = external.cancelled() => {
                self.abort.abort(ConvertError::AbortedByCaller);
                None
            }
            result = binding.finalize() => Some(result),
        };

        match finalized {
            Some(Ok(output)) => Ok((output, tracks)),
            Some(Err(e)) => {
                self.abort.abort(e.into());
                Err(self.fail(&binding).await)
            }
            None => Err(self.fail(&binding).await),
        }
    }

    /// Polls the parser and every pipeline until all of them are done or the
    /// conversion is aborted. Outstanding futures are dropped on return.
    async fn drive(
        &self,
        external: &CancellationToken,
        binding: &Arc<WriterBinding>,
    ) -> Vec<TrackSummary> {
        let token = self.abort.token();
        let (pipeline_tx, mut pipeline_rx) = mpsc::unbounded_channel::<PipelineFuture>();

        let router = TrackRouter::new(
            RouterSetup {
                pipeline: PipelineContext {
                    conversion_id: self.id,
                    cancel: token.clone(),
                    caller: external.clone(),
                    progress: self.progress.clone(),
                    writer: binding.clone(),
                    codecs: self.converter.codecs.clone(),
                },
                abort: self.abort.clone(),
                target: self.request.target,
                resolvers: self.request.resolvers.clone(),
                frame_hook: self.request.frame_hook.clone(),
                audio_bitrate: self.converter.config.audio_bitrate,
                duration_observer: self.request.duration_observer.clone(),
            },
            pipeline_tx,
        );
        let options = ParseOptions {
            fields: self.request.fields.with_duration(),
            container_hint: self.request.source.guess_container(),
            cancellation: token.clone(),
        };

        debug!(
            "Conversion {}: parsing with {} (hint: {:?})",
            self.id,
            self.converter.parser.name(),
            options.container_hint
        );
        let mut parse = self
            .converter
            .parser
            .parse(self.request.source.clone(), options, router);
        let mut parse_done = false;
        let mut pipelines: FuturesUnordered<PipelineFuture> = FuturesUnordered::new();
        let mut receiving = true;
        let mut tracks = Vec::new();

        loop {
            if parse_done && !receiving && pipelines.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = external.cancelled() => {
                    self.abort.abort(ConvertError::AbortedByCaller);
                    break;
                }
                result = &mut parse, if !parse_done => {
                    parse_done = true;
                    match result {
                        Ok(()) => {
                            debug!("Conversion {}: parsing finished", self.id);
                            pipeline_rx.close();
                        }
                        Err(e) => {
                            self.abort.abort(e.into());
                        }
                    }
                }
                next = pipeline_rx.recv(), if receiving => match next {
                    Some(pipeline) => pipelines.push(pipeline),
                    None => receiving = false,
                },
                Some(result) = pipelines.next(), if !pipelines.is_empty() => match result {
                    Ok(summary) => tracks.push(summary),
                    Err(e) => {
                        self.abort.abort(e);
                    }
                },
            }
        }

        tracks
    }

    /// Tears down a failed conversion and returns the error it settles with.
    async fn fail(&self, binding: &WriterBinding) -> ConvertError {
        self.progress.close();
        if let Err(e) = binding.discard().await {
            warn!("Conversion {}: failed to discard output: {}", self.id, e);
        }
        self.take_error()
    }

    fn take_error(&self) -> ConvertError {
        self.abort
            .take_error()
            .unwrap_or_else(|| ConvertError::aborted_internally("conversion stopped"))
    }
}
