//! Outcome of a successful conversion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::ConvertError;
use super::progress::ConversionState;
use super::types::ConversionTarget;
use crate::pipeline::TrackSummary;
use crate::writer::{Artifact, FinishedOutput};

/// Record of a finished conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub conversion_id: Uuid,
    /// Source as shown in logs.
    pub source: String,
    pub target: ConversionTarget,
    /// Final counters.
    pub state: ConversionState,
    /// One entry per source track, ordered by track id.
    pub tracks: Vec<TrackSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ConversionSummary {
    /// Looks up the summary of a source track.
    pub fn track(&self, track_id: u32) -> Option<&TrackSummary> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }
}

/// The finalized output of a conversion.
///
/// The output is not persisted until [`save`](Self::save) is called.
/// [`remove`](Self::remove) releases the intermediate output without touching
/// anything already saved.
pub struct ConversionResult {
    output: Box<dyn FinishedOutput>,
    summary: ConversionSummary,
}

impl ConversionResult {
    pub(crate) fn new(output: Box<dyn FinishedOutput>, summary: ConversionSummary) -> Self {
        Self { output, summary }
    }

    /// Persists the output. Saving twice returns equivalent artifacts.
    pub async fn save(&self) -> Result<Artifact, ConvertError> {
        Ok(self.output.save().await?)
    }

    /// Releases the intermediate output.
    pub async fn remove(&self) -> Result<(), ConvertError> {
        Ok(self.output.remove().await?)
    }

    /// Size of the output in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.output.size_bytes()
    }

    pub fn summary(&self) -> &ConversionSummary {
        &self.summary
    }

    /// Final counters of the conversion.
    pub fn state(&self) -> &ConversionState {
        &self.summary.state
    }
}

impl fmt::Debug for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionResult")
            .field("size_bytes", &self.output.size_bytes())
            .field("summary", &self.summary)
            .finish()
    }
}
