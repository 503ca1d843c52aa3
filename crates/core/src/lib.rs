pub mod codec;
pub mod config;
pub mod converter;
pub mod media;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod testing;
pub mod writer;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use converter::{
    AbortHandle, ConversionRequest, ConversionResult, ConversionState, ConversionSummary,
    Conversion, ConvertError, Converter, ConverterConfig,
};
pub use media::{CodedSample, Source, TrackDescriptor, TrackKind};
pub use parser::{ContainerParser, ParseError, SampleSink, TrackRouter};
pub use writer::{Artifact, StorageConfig, StorageWriterFactory, WriterError};
