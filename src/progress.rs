//! Progress reporting and cancellation support.
//!
//! A bake spends nearly all of its wall-clock time decoding native frames,
//! so the sampler, composer, and audio extractor report through
//! [`ProgressCallback`] and poll a shared [`CancellationToken`] between
//! units of work.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cutscene::{
//!     ArtifactPaths, CancellationToken, CutsceneError, CutsceneOptions, CutscenePipeline,
//!     ProgressCallback, ProgressInfo,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}%", info.operation);
//!         }
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = CutsceneOptions::new()
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_cancellation(token.clone());
//!
//! let artifacts = ArtifactPaths::in_directory("out", "intro")?;
//! let report = CutscenePipeline::new(options)?.bake("intro.mp4", &artifacts)?;
//! # Ok::<(), CutsceneError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The stage of a bake currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding native frames and retaining every stride-th one.
    FrameSampling,
    /// Copying sampled frames into the sprite sheet.
    Composition,
    /// Transcoding the audio stream to WAV.
    AudioExtraction,
}

/// A snapshot of progress within one stage.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which stage is running.
    pub operation: OperationType,
    /// Items (native frames, tiles, packets) processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the stage started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// The native frame index most recently processed (sampling only).
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates during a bake.
///
/// Callbacks observe but cannot halt the bake; use [`CancellationToken`]
/// to stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` items and once when a stage finishes.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state. A cancelled bake returns
/// [`CutsceneError::Cancelled`](crate::CutsceneError::Cancelled) and leaves
/// no partially written artifact behind.
///
/// ```
/// use cutscene::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks timing for one stage and emits batched callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item and fire the callback when a batch fills.
    pub(crate) fn advance(&mut self, frame_index: Option<u64>) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(frame_index);
            self.items_since_last_report = 0;
        }
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    fn report(&self, frame_index: Option<u64>) {
        let elapsed = self.start_time.elapsed();

        // Estimated frame counts can undershoot; never report past 100%.
        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current.min(total) as f32 / total as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_index,
        };

        self.callback.on_progress(&info);
    }
}
