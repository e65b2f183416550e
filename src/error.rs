//! Error types for the `cutscene` crate.
//!
//! This module defines [`CutsceneError`], the single error type returned by
//! every fallible operation in the crate. Variants carry the path, frame
//! index, or upstream message needed to diagnose a failed bake.
//!
//! Capacity truncation is deliberately absent here: it is reported through
//! [`Truncation`](crate::Truncation) on a successful result.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `cutscene` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CutsceneError {
    /// The source video could not be opened or probed.
    #[error("Failed to open video source at {path}: {reason}")]
    SourceOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The source does not contain a video stream.
    #[error("No video stream found in source")]
    NoVideoStream,

    /// A native frame could not be read, decoded, or converted to RGB.
    #[error("Failed to decode video frame: {0}")]
    VideoDecode(String),

    /// Sampling finished without retaining a single frame.
    #[error("No frames were extracted from the source")]
    EmptySource,

    /// A sampled frame does not match the tile size of the grid.
    #[error(
        "Frame {index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        /// Position of the offending frame in the sample set.
        index: usize,
        /// Tile width of the layout.
        expected_width: u32,
        /// Tile height of the layout.
        expected_height: u32,
        /// Width of the offending frame.
        actual_width: u32,
        /// Height of the offending frame.
        actual_height: u32,
    },

    /// A size, rate, ceiling, or index is outside its valid range.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The audio track could not be demuxed, transcoded, or written.
    #[error("Failed to extract audio: {0}")]
    AudioExtraction(String),

    /// An artifact could not be written to disk.
    #[error("Failed to write {path}: {reason}")]
    OutputWrite {
        /// Destination of the artifact.
        path: PathBuf,
        /// Underlying filesystem or encoder message.
        reason: String,
    },

    /// A layout record could not be parsed.
    #[error("Invalid sheet metadata: {0}")]
    InvalidMetadata(String),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// Any other error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),
}

impl CutsceneError {
    pub(crate) fn output_write(path: &Path, reason: impl Display) -> Self {
        CutsceneError::OutputWrite {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl From<FfmpegError> for CutsceneError {
    fn from(error: FfmpegError) -> Self {
        CutsceneError::Ffmpeg(error.to_string())
    }
}
