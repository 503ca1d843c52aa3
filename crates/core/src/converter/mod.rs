//! Transcode coordinator.
//!
//! [`Converter::convert`] validates a [`ConversionRequest`] and returns a
//! [`Conversion`] that does nothing until awaited. While it runs, the
//! conversion:
//!
//! - hands the source to the container parser with a track router,
//! - decides per track whether to re-encode, pass through or drop it,
//! - drives one pipeline per kept track into a single output writer,
//! - reports progress to the caller's observer,
//! - settles exactly once, with the first error if anything failed.
//!
//! # Example
//!
//! ```ignore
//! use webconvert_core::converter::{ConversionRequest, Converter, VideoCodec};
//!
//! let converter = Converter::from_config(&config, parser, codecs);
//! let conversion = converter.convert(
//!     ConversionRequest::new(PathBuf::from("/videos/input.mp4"))
//!         .with_video_codec(VideoCodec::Vp9)
//!         .with_progress(|state| println!("{} bytes", state.bytes_written)),
//! )?;
//!
//! let abort = conversion.abort_handle();
//! let result = conversion.await?;
//! let artifact = result.save().await?;
//! ```

mod abort;
mod config;
mod coordinator;
mod error;
mod progress;
mod request;
mod resolver;
mod result;
mod traits;
mod types;

pub use abort::{AbortController, AbortHandle};
pub use config::ConverterConfig;
pub use coordinator::{Conversion, Converter};
pub use error::ConvertError;
pub use progress::{ConversionState, FnObserver, ProgressObserver, ProgressTracker};
pub use request::ConversionRequest;
pub use resolver::{default_audio_action, default_video_action, CodecFamily, TrackResolvers};
pub use result::{ConversionResult, ConversionSummary};
pub use traits::{DurationObserver, FrameHook, TrackResolver};
pub use types::{
    AudioCodec, AudioTrackAction, ContainerFormat, ConversionTarget, TrackAction, VideoCodec,
    VideoTrackAction,
};
