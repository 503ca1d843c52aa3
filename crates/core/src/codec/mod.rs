//! Codec seam.
//!
//! The coordinator never decodes or encodes media itself. It asks a
//! [`CodecFactory`] for one decoder and one encoder per re-encoded track and
//! drives them sample by sample.

mod error;
mod traits;

pub use error::CodecError;
pub use traits::{AudioEncoderConfig, CodecFactory, Decoder, Encoder, VideoEncoderConfig};
