//! # cutscene
//!
//! Bake a video into a prebaked cutscene for a 2D engine: one sprite-sheet
//! PNG holding the frames, a JSON record describing how the sheet is tiled,
//! and a WAV file with the soundtrack. Decoding and audio transcoding are
//! powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Bake a video
//!
//! ```no_run
//! use cutscene::{AssetLayout, CutsceneOptions, CutscenePipeline};
//!
//! let assets = AssetLayout::new("../assets");
//! let pipeline = CutscenePipeline::new(CutsceneOptions::new())?;
//! let report = pipeline.bake(assets.source_path("intro.mp4"), &assets.artifacts("intro.mp4")?)?;
//!
//! if let Some(truncation) = report.truncated {
//!     eprintln!("{} frames did not fit", truncation.dropped);
//! }
//! # Ok::<(), cutscene::CutsceneError>(())
//! ```
//!
//! ### Play it back
//!
//! ```no_run
//! use std::path::Path;
//!
//! use cutscene::SheetMetadata;
//!
//! let metadata = SheetMetadata::read(Path::new("../assets/images/intro_metadata.json"))?;
//! for position in 0..metadata.frame_count() {
//!     let (column, row) = metadata.cell_of(position).unwrap();
//!     let x = column * metadata.format.tile_width;
//!     let y = row * metadata.format.tile_height;
//!     // blit the tile at (x, y) of the sheet
//! }
//! # Ok::<(), cutscene::CutsceneError>(())
//! ```
//!
//! ## How a bake works
//!
//! - **Capacity planning**: the largest grid of native-size tiles that fits
//!   under the texture ceiling (16384×16384 by default) caps how many frames
//!   can be kept.
//! - **Sampling**: native frames are downsampled to the target rate (30 fps
//!   by default) by keeping every `ceil(native / target)`-th frame. Frames
//!   past the cap are counted and reported as a [`Truncation`].
//! - **Composition**: tile `i` goes to column `i % columns`, row
//!   `i / columns`. Unused cells in the last row stay black.
//! - **Metadata**: geometry plus the playback order, serialized with a fixed
//!   key order so repeated bakes are byte-identical.
//! - **Audio**: the best audio stream is transcoded to 16-bit PCM WAV. By
//!   default a failure here leaves the sheet valid and is reported in the
//!   [`BakeReport`]; see [`AudioPolicy`].
//!
//! Every artifact is written to a temporary file next to its destination
//! and renamed into place once complete. The sheet and its record are
//! staged together; if the record cannot be put in place the new sheet is
//! removed again. A frame that fails to decode aborts the bake.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod audio;
pub mod compose;
pub mod configuration;
pub mod error;
pub mod ffmpeg;
pub mod layout;
pub mod metadata;
pub mod paths;
pub mod pipeline;
pub mod progress;
pub mod sampler;
pub mod source;
mod staging;

pub use audio::{AudioExtractor, AudioTrack};
pub use compose::{SpriteSheet, SpriteSheetComposer};
pub use configuration::{
    AudioPolicy, CutsceneOptions, DEFAULT_TARGET_FPS, DEFAULT_TEXTURE_LIMIT, TextureLimits,
};
pub use error::CutsceneError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use layout::{GridCapacity, GridLayout};
pub use metadata::{FrameIndex, SheetFormat, SheetMetadata};
pub use paths::{ArtifactPaths, AssetLayout, DEFAULT_ASSETS_ROOT, basename};
pub use pipeline::{AudioOutcome, BakeReport, CutscenePipeline};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use sampler::{
    FrameSampler, FrameSource, NativeFrame, SampleSet, SampledFrame, SamplingOutcome, Truncation,
    sampling_stride,
};
pub use source::{SourceFrames, SourceInfo, VideoSource};
