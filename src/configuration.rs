//! Bake configuration.
//!
//! [`CutsceneOptions`] is a builder constructed once per run and passed by
//! reference into every stage. It carries the output frame rate, the texture
//! ceiling, the audio policy, and the operational plumbing (progress
//! callback, cancellation token, report cadence).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cutscene::{AudioPolicy, CancellationToken, CutsceneOptions, TextureLimits};
//!
//! let token = CancellationToken::new();
//! let options = CutsceneOptions::new()
//!     .with_target_fps(24)
//!     .with_texture_limits(TextureLimits::new(8192, 8192))
//!     .with_audio_policy(AudioPolicy::Required)
//!     .with_cancellation(token.clone())
//!     .with_batch_size(30);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::CutsceneError;
use crate::progress::{
    CancellationToken, NoOpProgress, OperationType, ProgressCallback, ProgressTracker,
};

/// Output frame rate of a baked cutscene.
pub const DEFAULT_TARGET_FPS: u32 = 30;

/// Largest texture edge, in pixels, that SDL-class renderers reliably accept.
pub const DEFAULT_TEXTURE_LIMIT: u32 = 16_384;

/// Maximum raster size the sprite sheet may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLimits {
    /// Width ceiling in pixels.
    pub width: u32,
    /// Height ceiling in pixels.
    pub height: u32,
}

impl TextureLimits {
    /// Create limits from explicit ceilings.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for TextureLimits {
    fn default() -> Self {
        Self::new(DEFAULT_TEXTURE_LIMIT, DEFAULT_TEXTURE_LIMIT)
    }
}

/// What to do about the audio track once the sheet and metadata exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioPolicy {
    /// Extract audio; a failure is reported in the
    /// [`BakeReport`](crate::BakeReport) but the bake still succeeds.
    #[default]
    BestEffort,
    /// Extract audio; a failure fails the whole bake.
    Required,
    /// Do not extract audio at all.
    Skip,
}

/// Configuration for a bake.
///
/// A default-constructed value reproduces the classic behaviour: 30 fps,
/// a 16384×16384 ceiling, best-effort audio, no progress reporting.
#[derive(Clone)]
pub struct CutsceneOptions {
    pub(crate) target_fps: u32,
    pub(crate) limits: TextureLimits,
    pub(crate) audio_policy: AudioPolicy,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    /// Progress fires every N items. Defaults to 1.
    pub(crate) batch_size: u64,
}

impl Debug for CutsceneOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CutsceneOptions")
            .field("target_fps", &self.target_fps)
            .field("limits", &self.limits)
            .field("audio_policy", &self.audio_policy)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for CutsceneOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CutsceneOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            limits: TextureLimits::default(),
            audio_policy: AudioPolicy::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Set the output frame rate the sampler downsamples to.
    #[must_use]
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    /// Set the texture ceiling the sprite sheet must fit within.
    #[must_use]
    pub fn with_texture_limits(mut self, limits: TextureLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Choose how audio extraction failures are treated.
    #[must_use]
    pub fn with_audio_policy(mut self, policy: AudioPolicy) -> Self {
        self.audio_policy = policy;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The output frame rate.
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// The texture ceiling.
    pub fn texture_limits(&self) -> TextureLimits {
        self.limits
    }

    /// The audio policy.
    pub fn audio_policy(&self) -> AudioPolicy {
        self.audio_policy
    }

    /// Reject settings no bake can satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::Configuration`] for a zero frame rate or a
    /// zero texture ceiling.
    pub fn validate(&self) -> Result<(), CutsceneError> {
        if self.target_fps == 0 {
            return Err(CutsceneError::Configuration(
                "target frame rate must be greater than zero".to_string(),
            ));
        }
        if self.limits.width == 0 || self.limits.height == 0 {
            return Err(CutsceneError::Configuration(format!(
                "texture ceiling must be positive (got {}x{})",
                self.limits.width, self.limits.height
            )));
        }
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    pub(crate) fn tracker(&self, operation: OperationType, total: Option<u64>) -> ProgressTracker {
        ProgressTracker::new(self.progress.clone(), operation, total, self.batch_size)
    }
}
