//! Trait definitions for the parser module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::error::ParseError;
use super::router::TrackRouter;
use crate::converter::ContainerFormat;
use crate::media::Source;

/// Optional metadata the parser should compute besides tracks and samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFields {
    pub duration_in_seconds: bool,
    pub dimensions: bool,
    pub fps: bool,
    pub rotation: bool,
    pub metadata: bool,
}

impl ParseFields {
    /// Requests the duration.
    pub fn with_duration(mut self) -> Self {
        self.duration_in_seconds = true;
        self
    }

    /// Requests the video dimensions.
    pub fn with_dimensions(mut self) -> Self {
        self.dimensions = true;
        self
    }

    /// Requests the frame rate.
    pub fn with_fps(mut self) -> Self {
        self.fps = true;
        self
    }

    /// Requests the rotation.
    pub fn with_rotation(mut self) -> Self {
        self.rotation = true;
        self
    }

    /// Requests container metadata.
    pub fn with_metadata(mut self) -> Self {
        self.metadata = true;
        self
    }
}

/// Options passed to [`ContainerParser::parse`].
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub fields: ParseFields,
    /// Container guessed from the source name, if any.
    pub container_hint: Option<ContainerFormat>,
    /// Cancelled when the conversion stops. Parsers should stop reading.
    pub cancellation: CancellationToken,
}

/// Demultiplexes a source into tracks and coded samples.
///
/// Implementations report each track once through the router, then deliver
/// its samples in decode order through the returned sink. Awaiting
/// [`SampleSink::send`](super::SampleSink::send) applies backpressure.
#[async_trait]
pub trait ContainerParser: Send + Sync {
    /// Returns the name of this parser implementation.
    fn name(&self) -> &str;

    /// Parses `source` to completion.
    async fn parse(
        &self,
        source: Source,
        options: ParseOptions,
        router: TrackRouter,
    ) -> Result<(), ParseError>;
}
