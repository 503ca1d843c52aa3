//! Container parser seam.
//!
//! A [`ContainerParser`] turns a [`Source`](crate::media::Source) into track
//! reports and coded samples. The coordinator hands it a [`TrackRouter`];
//! every reported track gets a [`SampleSink`] connected to its pipeline.

mod error;
mod router;
mod traits;

pub use error::ParseError;
pub use router::{PipelineFuture, RouterSetup, SampleSink, TrackRouter};
pub use traits::{ContainerParser, ParseFields, ParseOptions};
