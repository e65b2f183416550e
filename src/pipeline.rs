//! The end-to-end bake.
//!
//! [`CutscenePipeline`] runs the stages strictly in order:
//!
//! 1. open the source and plan the grid capacity from its frame size;
//! 2. sample native frames down to the target rate, up to that capacity;
//! 3. finalize the grid for the number of frames kept;
//! 4. compose the sprite sheet and stage it with the metadata record, then
//!    commit both;
//! 5. extract the audio track, as the [`AudioPolicy`] allows.
//!
//! Open and decode failures abort before anything is written. When the
//! record cannot be committed the new sheet is removed, and when audio
//! extraction fails any older track at the destination is removed.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::audio::{AudioExtractor, AudioTrack};
use crate::compose::SpriteSheetComposer;
use crate::configuration::{AudioPolicy, CutsceneOptions};
use crate::error::CutsceneError;
use crate::layout::{GridCapacity, GridLayout};
use crate::metadata::SheetMetadata;
use crate::paths::ArtifactPaths;
use crate::sampler::{FrameSampler, FrameSource, Truncation, sampling_stride};
use crate::source::VideoSource;
use crate::staging::StagedFile;

/// What happened to the audio track.
#[derive(Debug)]
pub enum AudioOutcome {
    /// The track was written.
    Written(AudioTrack),
    /// Extraction failed under [`AudioPolicy::BestEffort`]; sheet and
    /// metadata are still valid.
    Failed(CutsceneError),
    /// Extraction was not attempted.
    Skipped,
}

/// Summary of a finished bake.
#[derive(Debug)]
pub struct BakeReport {
    /// Where the sprite sheet was written.
    pub sheet_path: PathBuf,
    /// Where the metadata record was written.
    pub metadata_path: PathBuf,
    /// Final grid of the sheet.
    pub layout: GridLayout,
    /// Tiles placed on the sheet.
    pub sample_count: usize,
    /// Native frames per retained frame.
    pub stride: u64,
    /// Native frames read from the source.
    pub frames_read: u64,
    /// Set when the sheet filled up before the source ended.
    pub truncated: Option<Truncation>,
    /// Audio stage result.
    pub audio: AudioOutcome,
}

impl BakeReport {
    /// `false` when audio extraction failed and the bake is only partial.
    pub fn is_complete(&self) -> bool {
        !matches!(self.audio, AudioOutcome::Failed(_))
    }
}

/// Runs a bake with one fixed set of options.
///
/// ```no_run
/// use cutscene::{AssetLayout, CutsceneOptions, CutscenePipeline};
///
/// let assets = AssetLayout::default();
/// let pipeline = CutscenePipeline::new(CutsceneOptions::new())?;
/// let report = pipeline.bake(assets.source_path("intro.mp4"), &assets.artifacts("intro.mp4")?)?;
/// println!("{} frames on {}", report.sample_count, report.sheet_path.display());
/// # Ok::<(), cutscene::CutsceneError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CutscenePipeline {
    options: CutsceneOptions,
}

impl CutscenePipeline {
    /// Validate `options` and build a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::Configuration`] for a zero frame rate or
    /// texture ceiling.
    pub fn new(options: CutsceneOptions) -> Result<Self, CutsceneError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// The options this pipeline runs with.
    pub fn options(&self) -> &CutsceneOptions {
        &self.options
    }

    /// Bake the video at `source_path` into `artifacts`.
    pub fn bake<P: AsRef<Path>>(
        &self,
        source_path: P,
        artifacts: &ArtifactPaths,
    ) -> Result<BakeReport, CutsceneError> {
        let source_path = source_path.as_ref();
        let mut source = VideoSource::open(source_path)?;
        let info = source.info().clone();
        log::info!(
            "Loaded video: {}x{} at {:.2} fps, ~{} frames",
            info.width,
            info.height,
            info.frames_per_second,
            info.frame_count
        );

        let mut report = self.bake_frames(
            &mut source.frames()?,
            info.frames_per_second,
            info.width,
            info.height,
            artifacts,
        )?;
        report.audio = self.extract_audio(source_path, &artifacts.audio)?;
        Ok(report)
    }

    /// Bake the sheet and metadata from any [`FrameSource`].
    ///
    /// The audio stage does not run; the report carries
    /// [`AudioOutcome::Skipped`].
    pub fn bake_frames<S>(
        &self,
        frames: &mut S,
        native_fps: f64,
        tile_width: u32,
        tile_height: u32,
        artifacts: &ArtifactPaths,
    ) -> Result<BakeReport, CutsceneError>
    where
        S: FrameSource + ?Sized,
    {
        let capacity = GridCapacity::plan(tile_width, tile_height, self.options.limits)?;
        if capacity.exceeds_limits() {
            log::warn!(
                "{}x{} frames exceed the {}x{} texture limit; the sheet will too",
                tile_width,
                tile_height,
                capacity.limits().width,
                capacity.limits().height
            );
        }

        let stride = sampling_stride(native_fps, self.options.target_fps);
        let sampler = FrameSampler::new(stride, capacity.max_frames())?;
        log::info!(
            "Sampling every {} frame(s) for {} fps, at most {} frames",
            stride,
            self.options.target_fps,
            capacity.max_frames()
        );
        let outcome = sampler.sample_with_options(frames, &self.options)?;

        let sample_count = outcome.samples.len();
        let layout = capacity.finalize(sample_count)?;
        log::info!(
            "Arranging {} frames into grid: {} columns x {} rows",
            sample_count,
            layout.columns,
            layout.rows
        );

        let sheet =
            SpriteSheetComposer::compose_with_options(&outcome.samples, &layout, &self.options)?;
        let metadata =
            SheetMetadata::new(artifacts.sheet.display().to_string(), &layout, sample_count);

        let staged_sheet = SpriteSheetComposer::stage_png(&sheet, &artifacts.sheet)?;
        let staged_metadata = metadata.stage(&artifacts.metadata)?;
        commit_sheet_and_metadata(staged_sheet, staged_metadata)?;

        Ok(BakeReport {
            sheet_path: artifacts.sheet.clone(),
            metadata_path: artifacts.metadata.clone(),
            layout,
            sample_count,
            stride: outcome.stride,
            frames_read: outcome.frames_read,
            truncated: outcome.truncated,
            audio: AudioOutcome::Skipped,
        })
    }

    fn extract_audio(
        &self,
        source_path: &Path,
        destination: &Path,
    ) -> Result<AudioOutcome, CutsceneError> {
        let policy = self.options.audio_policy;
        if policy == AudioPolicy::Skip {
            return Ok(AudioOutcome::Skipped);
        }

        let error =
            match AudioExtractor::extract_with_options(source_path, destination, &self.options) {
                Ok(track) => return Ok(AudioOutcome::Written(track)),
                Err(error) => error,
            };
        // The sheet is new; an older track left beside it would not match.
        remove_stale(destination);

        match error {
            CutsceneError::Cancelled => Err(CutsceneError::Cancelled),
            error if policy == AudioPolicy::BestEffort => {
                log::warn!("Audio extraction failed: {error}");
                Ok(AudioOutcome::Failed(error))
            }
            error => Err(error),
        }
    }
}

/// Commit the sheet, then its record. If the record cannot be committed the
/// new sheet is removed again, so a sheet never sits next to a record from
/// another run.
fn commit_sheet_and_metadata(
    staged_sheet: StagedFile,
    staged_metadata: StagedFile,
) -> Result<(), CutsceneError> {
    let sheet_path = staged_sheet.commit()?;
    if let Err(error) = staged_metadata.commit() {
        remove_stale(&sheet_path);
        return Err(error);
    }
    Ok(())
}

fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("Removed {}", path.display()),
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => log::warn!("Could not remove stale {}: {error}", path.display()),
    }
}
