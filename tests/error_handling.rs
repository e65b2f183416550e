//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for the failure
//! conditions a bake can hit.

use std::path::Path;

use cutscene::{
    ArtifactPaths, AudioExtractor, CutsceneError, CutsceneOptions, CutscenePipeline,
    GridCapacity, SheetMetadata, TextureLimits, VideoSource,
};

#[test]
fn open_nonexistent_file() {
    let result = VideoSource::open("this_file_does_not_exist.mp4");
    let error = result.err().expect("opening a missing file must fail");

    assert!(matches!(error, CutsceneError::SourceOpen { .. }));
    let error_message = error.to_string();
    assert!(
        error_message.contains("Failed to open video source"),
        "Error message should mention the open failure: {error_message}",
    );
}

#[test]
fn open_invalid_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = VideoSource::open(&invalid_file_path);
    assert!(result.is_err(), "Expected error for invalid media file");
}

#[test]
fn bake_of_missing_source_writes_nothing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let artifacts = ArtifactPaths::in_directory(temporary_directory.path(), "ghost").unwrap();

    let pipeline = CutscenePipeline::new(CutsceneOptions::new()).unwrap();
    let result = pipeline.bake("missing/ghost.mp4", &artifacts);

    assert!(matches!(result, Err(CutsceneError::SourceOpen { .. })));
    assert!(!artifacts.sheet.exists());
    assert!(!artifacts.metadata.exists());
    assert!(!artifacts.audio.exists());
}

#[test]
fn audio_from_missing_source_is_an_audio_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let destination = temporary_directory.path().join("music").join("ghost_audio.wav");

    let result = AudioExtractor::extract(Path::new("missing/ghost.mp4"), &destination);
    assert!(matches!(result, Err(CutsceneError::AudioExtraction(_))));
    assert!(!destination.exists());
}

#[test]
fn invalid_options_are_rejected_up_front() {
    let result = CutscenePipeline::new(CutsceneOptions::new().with_target_fps(0));
    assert!(matches!(result, Err(CutsceneError::Configuration(_))));

    let result = CutscenePipeline::new(
        CutsceneOptions::new().with_texture_limits(TextureLimits::new(16_384, 0)),
    );
    assert!(matches!(result, Err(CutsceneError::Configuration(_))));
}

#[test]
fn zero_sized_tiles_are_rejected() {
    let result = GridCapacity::plan(0, 0, TextureLimits::default());
    assert!(matches!(result, Err(CutsceneError::Configuration(_))));
}

#[test]
fn malformed_metadata_is_reported() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("intro_metadata.json");
    std::fs::write(&path, "{ \"filepath\": \"intro.png\" }").unwrap();

    let result = SheetMetadata::read(&path);
    assert!(matches!(result, Err(CutsceneError::InvalidMetadata(_))));
}

#[test]
fn error_display_names_the_frame() {
    let error = CutsceneError::DimensionMismatch {
        index: 12,
        expected_width: 1920,
        expected_height: 1080,
        actual_width: 1280,
        actual_height: 720,
    };
    assert_eq!(error.to_string(), "Frame 12 is 1280x720, expected 1920x1080");
}
