//! Storage writer integration tests.
//!
//! Runs conversions through the built-in [`StorageWriterFactory`] and checks
//! what ends up on disk or in memory.

mod common;

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use webconvert_core::testing::{fixtures, MockCodecFactory, MockParser};
use webconvert_core::{
    Artifact, Config, ConversionRequest, ConvertError, Converter, ConverterConfig, ParseError,
    StorageConfig, WriterError,
};

struct StorageHarness {
    parser: MockParser,
    converter: Converter,
    temp_dir: TempDir,
    output_dir: TempDir,
}

impl StorageHarness {
    async fn new(persistent: bool) -> Self {
        common::init_tracing();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let output_dir = TempDir::new().expect("Failed to create output dir");
        let config = Config {
            converter: ConverterConfig::default(),
            storage: StorageConfig::default()
                .with_temp_dir(temp_dir.path().to_path_buf())
                .with_output_dir(output_dir.path().join("converted"))
                .with_persistent_storage(persistent),
        };

        let parser = MockParser::new();
        parser
            .add_track(fixtures::vp8_track(1), fixtures::video_samples(1, 12))
            .await;
        parser
            .add_track(fixtures::opus_track(2), fixtures::audio_samples(2, 20))
            .await;

        let converter = Converter::from_config(
            &config,
            Arc::new(parser.clone()),
            Arc::new(MockCodecFactory::new()),
        );
        Self {
            parser,
            converter,
            temp_dir,
            output_dir,
        }
    }

    fn request(&self) -> ConversionRequest {
        ConversionRequest::new(PathBuf::from("/media/clip.mkv"))
    }

    fn temp_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.temp_dir.path())
            .expect("Failed to list temp dir")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect()
    }
}

#[tokio::test]
async fn test_file_output_save_and_remove() {
    let harness = StorageHarness::new(true).await;

    let result = harness
        .converter
        .convert(harness.request())
        .unwrap()
        .await
        .unwrap();
    let id = result.summary().conversion_id;

    let temp_path = harness.temp_dir.path().join(format!("{}.webm.part", id));
    assert!(temp_path.exists());

    let artifact = result.save().await.unwrap();
    let expected_path = harness
        .output_dir
        .path()
        .join("converted")
        .join(format!("{}.webm", id));
    match &artifact {
        Artifact::File { path, size_bytes } => {
            assert_eq!(path, &expected_path);
            assert_eq!(*size_bytes, result.size_bytes());
            assert_eq!(std::fs::metadata(path).unwrap().len(), result.size_bytes());
        }
        other => panic!("expected a file artifact, got {other:?}"),
    }
    assert_eq!(result.size_bytes(), result.state().bytes_written);

    // Saving again returns the same artifact.
    assert_eq!(result.save().await.unwrap(), artifact);

    result.remove().await.unwrap();
    result.remove().await.unwrap();
    assert!(!temp_path.exists());
    assert!(expected_path.exists());
}

#[tokio::test]
async fn test_memory_output_when_persistence_disabled() {
    let harness = StorageHarness::new(false).await;

    let result = harness
        .converter
        .convert(harness.request())
        .unwrap()
        .await
        .unwrap();

    assert!(harness.temp_files().is_empty());
    let artifact = result.save().await.unwrap();
    assert!(matches!(&artifact, Artifact::Memory(bytes) if bytes.len() as u64 == result.size_bytes()));
    assert_eq!(artifact.size_bytes(), result.state().bytes_written);

    result.remove().await.unwrap();
    let err = result.save().await.unwrap_err();
    assert!(matches!(err, ConvertError::Write(WriterError::Removed)));
    // The artifact saved before removal keeps its bytes.
    assert_eq!(artifact.size_bytes(), result.size_bytes());
}

#[tokio::test]
async fn test_failed_conversion_leaves_no_temp_file() {
    let harness = StorageHarness::new(true).await;
    harness
        .parser
        .set_next_error(ParseError::read_failed("/media/clip.mkv", "connection reset"))
        .await;

    let err = harness
        .converter
        .convert(harness.request())
        .unwrap()
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::Parse(ParseError::ReadFailed { .. })));
    let leftovers: Vec<_> = harness
        .temp_files()
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "part"))
        .collect();
    assert!(leftovers.is_empty(), "unexpected temp files: {leftovers:?}");
}

#[tokio::test]
async fn test_dropped_conversion_leaves_no_temp_file() {
    let harness = StorageHarness::new(true).await;
    harness.parser.set_stall_after(5).await;

    let conversion = harness.converter.convert(harness.request()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_millis(200), conversion.into_future()).await;

    assert!(outcome.is_err(), "conversion should still be stalled");
    assert_eq!(harness.parser.samples_sent().await, 5);
    let leftovers: Vec<_> = harness
        .temp_files()
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "part"))
        .collect();
    assert!(leftovers.is_empty(), "unexpected temp files: {leftovers:?}");
}

#[tokio::test]
async fn test_container_hint_from_matroska_name() {
    let harness = StorageHarness::new(false).await;
    harness
        .converter
        .convert(harness.request())
        .unwrap()
        .await
        .unwrap();

    let parses = harness.parser.recorded_parses().await;
    assert_eq!(
        parses[0].container_hint,
        Some(webconvert_core::converter::ContainerFormat::Webm)
    );
}
