//! Output writer seam and the built-in storage writers.
//!
//! The coordinator only talks to an [`OutputWriter`] through a
//! [`WriterBinding`]. Two implementations ship with the crate:
//!
//! - [`BufferWriter`] keeps the output in memory.
//! - [`FileWriter`] streams it into a temp file and links it into the output
//!   directory on save.
//!
//! [`StorageWriterFactory`] picks between them after probing the temp
//! directory once.

mod binding;
mod buffer;
mod capabilities;
mod config;
mod error;
mod factory;
mod file;
mod stream;
mod traits;

pub use binding::WriterBinding;
pub use buffer::{BufferWriter, MemoryOutput};
pub use capabilities::StorageCapabilities;
pub use config::StorageConfig;
pub use error::WriterError;
pub use factory::StorageWriterFactory;
pub use file::{FileOutput, FileWriter};
pub use stream::CHUNK_HEADER_LEN;
pub use traits::{
    Artifact, FinishedOutput, OutputTrack, OutputWriter, WriterFactory, WriterProgress,
};
