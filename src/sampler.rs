//! Fixed-rate frame sampling with a hard capacity cap.
//!
//! [`FrameSampler`] walks a [`FrameSource`] in native order and keeps every
//! `stride`-th frame, where the stride is derived from the native and target
//! frame rates by [`sampling_stride`]. Once the sheet capacity is reached the
//! rest of the source is counted but not converted, and the number of frames
//! that would have been kept is reported as a [`Truncation`].
//!
//! The sampler only depends on the [`FrameSource`] trait, so it runs equally
//! over an FFmpeg decoder ([`SourceFrames`](crate::SourceFrames)) or an
//! in-memory frame list.

use image::RgbImage;

use crate::configuration::CutsceneOptions;
use crate::error::CutsceneError;
use crate::progress::OperationType;

/// Native frames to advance per retained frame.
///
/// Equal to `ceil(max(native_fps / target_fps, 1))`: a source slower than
/// the target keeps every frame, a faster one keeps every n-th. Non-finite
/// or non-positive native rates, and a zero target, fall back to 1.
///
/// ```
/// use cutscene::sampling_stride;
///
/// assert_eq!(sampling_stride(60.0, 30), 2);
/// assert_eq!(sampling_stride(24.0, 30), 1);
/// assert_eq!(sampling_stride(29.97, 30), 1);
/// assert_eq!(sampling_stride(50.0, 30), 2);
/// ```
pub fn sampling_stride(native_fps: f64, target_fps: u32) -> u64 {
    if !native_fps.is_finite() || native_fps <= 0.0 || target_fps == 0 {
        return 1;
    }
    let ratio = (native_fps / f64::from(target_fps)).max(1.0);
    ratio.ceil() as u64
}

/// Number of indices in `start..start + count` divisible by `stride`.
pub(crate) fn retained_between(start: u64, count: u64, stride: u64) -> u64 {
    let stride = stride.max(1);
    (start + count).div_ceil(stride) - start.div_ceil(stride)
}

/// One native frame as produced by a [`FrameSource`].
#[derive(Debug, Clone)]
pub enum NativeFrame {
    /// The frame converted to packed RGB.
    Captured(RgbImage),
    /// The frame was decoded but not converted.
    Skipped,
}

/// A sequential supplier of native frames.
///
/// Implementors yield every frame of the stream exactly once, in
/// presentation order. Conversion to RGB only happens when the caller asks
/// for it, so skipped frames stay cheap.
pub trait FrameSource {
    /// Advance to the next native frame.
    ///
    /// Returns [`NativeFrame::Captured`] when `capture` is `true`,
    /// [`NativeFrame::Skipped`] otherwise, and `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::VideoDecode`] if the frame cannot be read or
    /// converted. The sampler aborts on the first error.
    fn next_frame(&mut self, capture: bool) -> Result<Option<NativeFrame>, CutsceneError>;

    /// Count the native frames left without converting any of them.
    ///
    /// The source is exhausted afterwards.
    fn count_remaining(&mut self) -> Result<u64, CutsceneError>;

    /// Best estimate of the total native frame count, used for progress.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

/// A retained frame and its index in the native stream.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    image: RgbImage,
    source_index: u64,
}

impl SampledFrame {
    /// Wrap an already-decoded frame.
    pub fn new(image: RgbImage, source_index: u64) -> Self {
        Self {
            image,
            source_index,
        }
    }

    /// The RGB pixels of this frame.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Index of this frame in the native stream.
    pub fn source_index(&self) -> u64 {
        self.source_index
    }

    /// Width and height of the frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Take ownership of the pixels.
    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Retained frames in increasing native order.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    frames: Vec<SampledFrame>,
}

impl SampleSet {
    /// Build a set from frames already in native order.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::Configuration`] if the source indices are
    /// not strictly increasing.
    pub fn from_frames(frames: Vec<SampledFrame>) -> Result<Self, CutsceneError> {
        if let Some(pair) = frames
            .windows(2)
            .find(|pair| pair[0].source_index >= pair[1].source_index)
        {
            return Err(CutsceneError::Configuration(format!(
                "sample order broken: frame {} follows frame {}",
                pair[1].source_index, pair[0].source_index
            )));
        }
        Ok(Self { frames })
    }

    /// Number of frames in the set.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` if the set holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The frame at placement position `index`.
    pub fn get(&self, index: usize) -> Option<&SampledFrame> {
        self.frames.get(index)
    }

    /// Iterate frames in placement order.
    pub fn iter(&self) -> std::slice::Iter<'_, SampledFrame> {
        self.frames.iter()
    }

    /// Native indices of all frames, in placement order.
    pub fn source_indices(&self) -> Vec<u64> {
        self.frames.iter().map(SampledFrame::source_index).collect()
    }

    fn push(&mut self, frame: SampledFrame) {
        self.frames.push(frame);
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a SampledFrame;
    type IntoIter = std::slice::Iter<'a, SampledFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Frames lost because the sheet was full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// The cap that was hit (`max_frames`).
    pub capacity: usize,
    /// Frames that would have been retained past the cap.
    pub dropped: u64,
}

/// Everything a sampling pass produced.
#[derive(Debug, Clone)]
pub struct SamplingOutcome {
    /// The retained frames.
    pub samples: SampleSet,
    /// The stride used.
    pub stride: u64,
    /// Native frames read, including skipped and counted-only ones.
    pub frames_read: u64,
    /// Set when the capacity cap cut the sequence short.
    pub truncated: Option<Truncation>,
}

/// Selects a fixed-rate subsequence of native frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSampler {
    stride: u64,
    max_frames: usize,
}

impl FrameSampler {
    /// Create a sampler keeping every `stride`-th frame, at most `max_frames`.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::Configuration`] if either argument is zero.
    pub fn new(stride: u64, max_frames: usize) -> Result<Self, CutsceneError> {
        if stride == 0 {
            return Err(CutsceneError::Configuration(
                "sampling stride must be at least 1".to_string(),
            ));
        }
        if max_frames == 0 {
            return Err(CutsceneError::Configuration(
                "frame capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self { stride, max_frames })
    }

    /// Build a sampler from native and target rates.
    pub fn for_rates(
        native_fps: f64,
        target_fps: u32,
        max_frames: usize,
    ) -> Result<Self, CutsceneError> {
        Self::new(sampling_stride(native_fps, target_fps), max_frames)
    }

    /// The stride in native frames.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// The hard cap on retained frames.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Sample `source` with default options.
    pub fn sample<S>(&self, source: &mut S) -> Result<SamplingOutcome, CutsceneError>
    where
        S: FrameSource + ?Sized,
    {
        self.sample_with_options(source, &CutsceneOptions::default())
    }

    /// Sample `source`, reporting progress and honouring cancellation.
    ///
    /// # Errors
    ///
    /// - [`CutsceneError::Cancelled`] if the token fires.
    /// - [`CutsceneError::EmptySource`] if no frame was retained.
    /// - Any error from the source; the pass stops at the first one.
    pub fn sample_with_options<S>(
        &self,
        source: &mut S,
        options: &CutsceneOptions,
    ) -> Result<SamplingOutcome, CutsceneError>
    where
        S: FrameSource + ?Sized,
    {
        let mut tracker = options.tracker(OperationType::FrameSampling, source.frame_count_hint());
        let mut samples = SampleSet::default();
        let mut index: u64 = 0;
        let mut truncated = None;

        loop {
            if options.is_cancelled() {
                return Err(CutsceneError::Cancelled);
            }

            if samples.len() == self.max_frames {
                let remaining = source.count_remaining()?;
                let dropped = retained_between(index, remaining, self.stride);
                index += remaining;
                if dropped > 0 {
                    log::warn!(
                        "Sheet capacity of {} frames reached; {} later frames were dropped",
                        self.max_frames,
                        dropped,
                    );
                    truncated = Some(Truncation {
                        capacity: self.max_frames,
                        dropped,
                    });
                }
                break;
            }

            let capture = index % self.stride == 0;
            match source.next_frame(capture)? {
                Some(NativeFrame::Captured(image)) if capture => {
                    samples.push(SampledFrame::new(image, index));
                }
                Some(NativeFrame::Skipped) if capture => {
                    return Err(CutsceneError::VideoDecode(format!(
                        "frame {index} was requested but not captured"
                    )));
                }
                Some(NativeFrame::Captured(_)) | Some(NativeFrame::Skipped) => {}
                None => break,
            }

            tracker.advance(Some(index));
            index += 1;
        }

        tracker.finish();

        if samples.is_empty() {
            return Err(CutsceneError::EmptySource);
        }

        log::info!(
            "Sampled {} of {} native frames (stride {})",
            samples.len(),
            index,
            self.stride,
        );

        Ok(SamplingOutcome {
            samples,
            stride: self.stride,
            frames_read: index,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        total: u64,
        position: u64,
        captured: u64,
    }

    impl Counter {
        fn new(total: u64) -> Self {
            Self {
                total,
                position: 0,
                captured: 0,
            }
        }
    }

    impl FrameSource for Counter {
        fn next_frame(&mut self, capture: bool) -> Result<Option<NativeFrame>, CutsceneError> {
            if self.position == self.total {
                return Ok(None);
            }
            self.position += 1;
            if capture {
                self.captured += 1;
                Ok(Some(NativeFrame::Captured(RgbImage::new(1, 1))))
            } else {
                Ok(Some(NativeFrame::Skipped))
            }
        }

        fn count_remaining(&mut self) -> Result<u64, CutsceneError> {
            let remaining = self.total - self.position;
            self.position = self.total;
            Ok(remaining)
        }
    }

    #[test]
    fn stride_rounds_up() {
        assert_eq!(sampling_stride(60.0, 30), 2);
        assert_eq!(sampling_stride(24.0, 30), 1);
        assert_eq!(sampling_stride(90.0, 30), 3);
        assert_eq!(sampling_stride(61.0, 30), 3);
    }

    #[test]
    fn stride_falls_back_to_one() {
        assert_eq!(sampling_stride(0.0, 30), 1);
        assert_eq!(sampling_stride(-5.0, 30), 1);
        assert_eq!(sampling_stride(f64::NAN, 30), 1);
        assert_eq!(sampling_stride(f64::INFINITY, 30), 1);
        assert_eq!(sampling_stride(60.0, 0), 1);
    }

    #[test]
    fn retained_between_counts_multiples() {
        assert_eq!(retained_between(0, 10, 2), 5);
        assert_eq!(retained_between(1, 10, 2), 5);
        assert_eq!(retained_between(1, 1, 2), 0);
        assert_eq!(retained_between(240, 360, 2), 180);
        assert_eq!(retained_between(5, 0, 3), 0);
    }

    #[test]
    fn zero_arguments_are_rejected() {
        assert!(matches!(
            FrameSampler::new(0, 10),
            Err(CutsceneError::Configuration(_))
        ));
        assert!(matches!(
            FrameSampler::new(1, 0),
            Err(CutsceneError::Configuration(_))
        ));
    }

    #[test]
    fn only_retained_frames_are_converted() {
        let mut source = Counter::new(10);
        let outcome = FrameSampler::new(3, 100).unwrap().sample(&mut source).unwrap();
        assert_eq!(outcome.samples.source_indices(), vec![0, 3, 6, 9]);
        assert_eq!(source.captured, 4);
        assert_eq!(outcome.frames_read, 10);
        assert!(outcome.truncated.is_none());
    }

    #[test]
    fn exact_fill_is_not_truncation() {
        let mut source = Counter::new(7);
        let outcome = FrameSampler::new(2, 4).unwrap().sample(&mut source).unwrap();
        assert_eq!(outcome.samples.len(), 4);
        assert!(outcome.truncated.is_none());
    }

    #[test]
    fn trailing_skipped_frames_are_not_truncation() {
        // Frames 0, 2, 4, 6 fill the cap; frame 7 would be skipped anyway.
        let mut source = Counter::new(8);
        let outcome = FrameSampler::new(2, 4).unwrap().sample(&mut source).unwrap();
        assert!(outcome.truncated.is_none());
        assert_eq!(outcome.frames_read, 8);
    }

    #[test]
    fn empty_source_is_an_error() {
        let mut source = Counter::new(0);
        assert!(matches!(
            FrameSampler::new(1, 4).unwrap().sample(&mut source),
            Err(CutsceneError::EmptySource)
        ));
    }

    /// Answers every request with `Skipped`, even when asked to capture.
    struct NeverCaptures;

    impl FrameSource for NeverCaptures {
        fn next_frame(&mut self, _capture: bool) -> Result<Option<NativeFrame>, CutsceneError> {
            Ok(Some(NativeFrame::Skipped))
        }

        fn count_remaining(&mut self) -> Result<u64, CutsceneError> {
            Ok(0)
        }
    }

    #[test]
    fn uncaptured_requested_frame_is_an_error() {
        let result = FrameSampler::new(1, 4).unwrap().sample(&mut NeverCaptures);
        assert!(matches!(result, Err(CutsceneError::VideoDecode(_))));
    }

    #[test]
    fn sample_set_rejects_unordered_frames() {
        let frames = vec![
            SampledFrame::new(RgbImage::new(1, 1), 4),
            SampledFrame::new(RgbImage::new(1, 1), 2),
        ];
        assert!(SampleSet::from_frames(frames).is_err());
    }
}
