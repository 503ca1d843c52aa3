//! Mock container parser for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::converter::ContainerFormat;
use crate::media::{CodedSample, Source, TrackDescriptor, TrackKind};
use crate::parser::{ContainerParser, ParseError, ParseFields, ParseOptions, SampleSink, TrackRouter};

/// A track the mock parser reports, with the samples it delivers.
#[derive(Debug, Clone)]
pub struct MockTrack {
    pub descriptor: TrackDescriptor,
    pub samples: Vec<CodedSample>,
}

/// A recorded parse call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedParse {
    /// Source as shown in logs.
    pub source: String,
    pub fields: ParseFields,
    pub container_hint: Option<ContainerFormat>,
}

/// Mock implementation of the ContainerParser trait.
///
/// Reports the configured tracks, then delivers their samples interleaved
/// round-robin, one sample per track per round.
///
/// Provides controllable behavior for testing:
/// - Configure tracks, samples and duration
/// - Simulate failure before any track is reported
/// - Stall after a number of samples until the conversion is cancelled
/// - Report a track twice
///
/// # Example
///
/// ```rust,ignore
/// use webconvert_core::testing::{fixtures, MockParser};
///
/// let parser = MockParser::new();
/// parser.add_track(fixtures::vp9_track(1), fixtures::video_samples(1, 30)).await;
/// parser.set_duration(1.0).await;
/// ```
#[derive(Debug, Clone)]
pub struct MockParser {
    tracks: Arc<RwLock<Vec<MockTrack>>>,
    duration: Arc<RwLock<Option<f64>>>,
    next_error: Arc<RwLock<Option<ParseError>>>,
    stall_after: Arc<RwLock<Option<usize>>>,
    report_duplicate: Arc<RwLock<bool>>,
    parses: Arc<RwLock<Vec<RecordedParse>>>,
    samples_sent: Arc<RwLock<usize>>,
}

impl Default for MockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockParser {
    /// Create a new mock parser with no tracks.
    pub fn new() -> Self {
        Self {
            tracks: Arc::new(RwLock::new(Vec::new())),
            duration: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            stall_after: Arc::new(RwLock::new(None)),
            report_duplicate: Arc::new(RwLock::new(false)),
            parses: Arc::new(RwLock::new(Vec::new())),
            samples_sent: Arc::new(RwLock::new(0)),
        }
    }

    /// Add a track with the samples to deliver for it.
    pub async fn add_track(&self, descriptor: TrackDescriptor, samples: Vec<CodedSample>) {
        self.tracks.write().await.push(MockTrack {
            descriptor,
            samples,
        });
    }

    /// Set the duration reported to the router.
    pub async fn set_duration(&self, seconds: f64) {
        *self.duration.write().await = Some(seconds);
    }

    /// Configure the next parse to fail with the given error.
    pub async fn set_next_error(&self, error: ParseError) {
        *self.next_error.write().await = Some(error);
    }

    /// Stop delivering after `count` samples and wait for cancellation.
    pub async fn set_stall_after(&self, count: usize) {
        *self.stall_after.write().await = Some(count);
    }

    /// Report the first track a second time after all tracks were reported.
    pub async fn set_report_duplicate(&self, enabled: bool) {
        *self.report_duplicate.write().await = enabled;
    }

    /// Get all recorded parse calls.
    pub async fn recorded_parses(&self) -> Vec<RecordedParse> {
        self.parses.read().await.clone()
    }

    /// Number of samples accepted by sinks so far.
    pub async fn samples_sent(&self) -> usize {
        *self.samples_sent.read().await
    }

    fn open(router: &mut TrackRouter, track: &TrackDescriptor) -> Result<SampleSink, ParseError> {
        match track.kind() {
            TrackKind::Video => router.on_video_track(track.clone()),
            TrackKind::Audio => router.on_audio_track(track.clone()),
        }
    }
}

#[async_trait]
impl ContainerParser for MockParser {
    fn name(&self) -> &str {
        "mock"
    }

    async fn parse(
        &self,
        source: Source,
        options: ParseOptions,
        mut router: TrackRouter,
    ) -> Result<(), ParseError> {
        self.parses.write().await.push(RecordedParse {
            source: source.describe(),
            fields: options.fields,
            container_hint: options.container_hint,
        });

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        if let Some(seconds) = *self.duration.read().await {
            router.on_duration(seconds);
        }

        let tracks = self.tracks.read().await.clone();
        let mut sinks = Vec::with_capacity(tracks.len());
        for track in &tracks {
            sinks.push(Self::open(&mut router, &track.descriptor)?);
        }
        if *self.report_duplicate.read().await {
            if let Some(first) = tracks.first() {
                Self::open(&mut router, &first.descriptor)?;
            }
        }

        let stall_after = *self.stall_after.read().await;
        let rounds = tracks.iter().map(|t| t.samples.len()).max().unwrap_or(0);
        let mut sent = 0;

        for round in 0..rounds {
            if router.is_cancelled() {
                return Err(ParseError::aborted("conversion stopped"));
            }
            for (track, sink) in tracks.iter().zip(&sinks) {
                if sink.is_discarding() {
                    continue;
                }
                let Some(sample) = track.samples.get(round) else {
                    continue;
                };
                if stall_after == Some(sent) {
                    options.cancellation.cancelled().await;
                    return Err(ParseError::aborted("cancelled while stalled"));
                }
                sink.send(sample.clone()).await?;
                sent += 1;
                *self.samples_sent.write().await = sent;
            }
        }

        for sink in sinks {
            sink.finish();
        }
        Ok(())
    }
}
