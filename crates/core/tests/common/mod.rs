//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Once};

use webconvert_core::testing::{MockCodecFactory, MockParser, MockWriterFactory};
use webconvert_core::{ConversionRequest, Converter};

static TRACING: Once = Once::new();

/// Installs a test subscriber once per binary. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "webconvert_core=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Converter wired to mocks, with handles to inspect them.
pub struct TestHarness {
    pub parser: MockParser,
    pub codecs: MockCodecFactory,
    pub writers: MockWriterFactory,
    pub converter: Converter,
}

impl TestHarness {
    pub fn new() -> Self {
        init_tracing();
        let parser = MockParser::new();
        let codecs = MockCodecFactory::new();
        let writers = MockWriterFactory::new();
        let converter = Converter::new(
            Arc::new(parser.clone()),
            Arc::new(codecs.clone()),
            Arc::new(writers.clone()),
        );
        Self {
            parser,
            codecs,
            writers,
            converter,
        }
    }

    /// A request for a local WebM source with the default target.
    pub fn request(&self) -> ConversionRequest {
        ConversionRequest::new(PathBuf::from("/media/input.webm"))
    }
}
