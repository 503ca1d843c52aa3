//! Aggregate progress of one conversion.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::media::TrackKind;
use crate::metrics;
use crate::writer::WriterProgress;

/// Counters of a running conversion. Every field only grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionState {
    pub decoded_video_frames: u64,
    pub decoded_audio_frames: u64,
    pub encoded_video_frames: u64,
    pub encoded_audio_frames: u64,
    pub bytes_written: u64,
    pub milliseconds_written: u64,
}

/// Receives a snapshot every time a counter advances.
///
/// Called while the tracker's lock is held, so implementations must return
/// quickly and must not call back into the conversion.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, state: &ConversionState);
}

/// Adapts a closure into a [`ProgressObserver`].
pub struct FnObserver<F>(pub F);

impl<F> ProgressObserver for FnObserver<F>
where
    F: Fn(&ConversionState) + Send + Sync,
{
    fn on_progress(&self, state: &ConversionState) {
        (self.0)(state)
    }
}

impl ProgressObserver for watch::Sender<ConversionState> {
    fn on_progress(&self, state: &ConversionState) {
        self.send_replace(*state);
    }
}

struct TrackerInner {
    state: ConversionState,
    closed: bool,
}

/// Merges counter updates from pipelines and the writer into one state.
///
/// Once closed, or once any token passed to [`ProgressTracker::stop_on`] is
/// cancelled, updates are ignored and the observer is never called again.
pub struct ProgressTracker {
    inner: Mutex<TrackerInner>,
    observer: Option<Arc<dyn ProgressObserver>>,
    stop_tokens: Vec<CancellationToken>,
}

impl ProgressTracker {
    pub fn new(observer: Option<Arc<dyn ProgressObserver>>) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                state: ConversionState::default(),
                closed: false,
            }),
            observer,
            stop_tokens: Vec::new(),
        }
    }

    /// Ignores all updates after `token` is cancelled.
    pub fn stop_on(mut self, token: CancellationToken) -> Self {
        self.stop_tokens.push(token);
        self
    }

    /// Counts one frame produced by a decoder.
    pub fn frame_decoded(&self, kind: TrackKind) {
        metrics::FRAMES_PROCESSED
            .with_label_values(&[kind.as_str(), "decoded"])
            .inc();
        self.update(|state| {
            match kind {
                TrackKind::Video => state.decoded_video_frames += 1,
                TrackKind::Audio => state.decoded_audio_frames += 1,
            }
            true
        });
    }

    /// Counts one chunk produced by an encoder or passed through.
    pub fn chunk_encoded(&self, kind: TrackKind) {
        metrics::FRAMES_PROCESSED
            .with_label_values(&[kind.as_str(), "encoded"])
            .inc();
        self.update(|state| {
            match kind {
                TrackKind::Video => state.encoded_video_frames += 1,
                TrackKind::Audio => state.encoded_audio_frames += 1,
            }
            true
        });
    }

    /// Applies cumulative totals reported by the writer. Totals lower than
    /// what was already seen are ignored.
    pub fn writer_progress(&self, progress: WriterProgress) {
        self.update(|state| {
            let mut advanced = false;
            if progress.bytes_written > state.bytes_written {
                state.bytes_written = progress.bytes_written;
                advanced = true;
            }
            if progress.milliseconds_written > state.milliseconds_written {
                state.milliseconds_written = progress.milliseconds_written;
                advanced = true;
            }
            advanced
        });
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> ConversionState {
        self.lock().state
    }

    /// Stops all further updates and observer calls.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn update(&self, apply: impl FnOnce(&mut ConversionState) -> bool) {
        let mut inner = self.lock();
        if inner.closed || self.stop_tokens.iter().any(|t| t.is_cancelled()) {
            return;
        }
        if apply(&mut inner.state) {
            if let Some(observer) = &self.observer {
                observer.on_progress(&inner.state);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_tracker() -> (ProgressTracker, Arc<Mutex<Vec<ConversionState>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = FnObserver(move |state: &ConversionState| {
            sink.lock().unwrap().push(*state);
        });
        (ProgressTracker::new(Some(Arc::new(observer))), seen)
    }

    #[test]
    fn test_counters_by_kind() {
        let (tracker, seen) = recording_tracker();
        tracker.frame_decoded(TrackKind::Video);
        tracker.chunk_encoded(TrackKind::Video);
        tracker.chunk_encoded(TrackKind::Audio);

        let state = tracker.snapshot();
        assert_eq!(state.decoded_video_frames, 1);
        assert_eq!(state.encoded_video_frames, 1);
        assert_eq!(state.encoded_audio_frames, 1);
        assert_eq!(state.decoded_audio_frames, 0);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_writer_progress_never_moves_back() {
        let (tracker, seen) = recording_tracker();
        tracker.writer_progress(WriterProgress {
            bytes_written: 100,
            milliseconds_written: 40,
        });
        tracker.writer_progress(WriterProgress {
            bytes_written: 80,
            milliseconds_written: 20,
        });
        tracker.writer_progress(WriterProgress {
            bytes_written: 100,
            milliseconds_written: 40,
        });

        let state = tracker.snapshot();
        assert_eq!(state.bytes_written, 100);
        assert_eq!(state.milliseconds_written, 40);
        // Only the first report advanced anything.
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_milliseconds_alone_notifies() {
        let (tracker, seen) = recording_tracker();
        tracker.writer_progress(WriterProgress {
            bytes_written: 10,
            milliseconds_written: 0,
        });
        tracker.writer_progress(WriterProgress {
            bytes_written: 10,
            milliseconds_written: 33,
        });
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_closed_tracker_is_silent() {
        let (tracker, seen) = recording_tracker();
        tracker.chunk_encoded(TrackKind::Audio);
        tracker.close();
        tracker.chunk_encoded(TrackKind::Audio);
        tracker.writer_progress(WriterProgress {
            bytes_written: 1000,
            milliseconds_written: 1000,
        });

        assert!(tracker.is_closed());
        assert_eq!(tracker.snapshot().encoded_audio_frames, 1);
        assert_eq!(tracker.snapshot().bytes_written, 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cancelled_token_silences_tracker() {
        let (tracker, seen) = recording_tracker();
        let token = CancellationToken::new();
        let tracker = tracker.stop_on(CancellationToken::new()).stop_on(token.clone());

        tracker.frame_decoded(TrackKind::Video);
        token.cancel();
        tracker.frame_decoded(TrackKind::Video);
        tracker.chunk_encoded(TrackKind::Video);
        tracker.writer_progress(WriterProgress {
            bytes_written: 64,
            milliseconds_written: 33,
        });

        let state = tracker.snapshot();
        assert_eq!(state.decoded_video_frames, 1);
        assert_eq!(state.encoded_video_frames, 0);
        assert_eq!(state.bytes_written, 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_watch_observer() {
        let (tx, rx) = watch::channel(ConversionState::default());
        let tracker = ProgressTracker::new(Some(Arc::new(tx)));
        tracker.frame_decoded(TrackKind::Audio);
        tracker.frame_decoded(TrackKind::Audio);
        assert_eq!(rx.borrow().decoded_audio_frames, 2);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let state = ConversionState {
            bytes_written: 5,
            ..Default::default()
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["bytesWritten"], 5);
        assert_eq!(json["encodedVideoFrames"], 0);
    }
}
