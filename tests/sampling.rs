//! Frame sampling integration tests over synthetic sources.

mod common;

use common::{VecSource, frame_index};
use cutscene::{
    CutsceneError, FrameSampler, GridCapacity, TextureLimits, Truncation, sampling_stride,
};

#[test]
fn sixty_fps_keeps_every_other_frame() {
    let stride = sampling_stride(60.0, 30);
    assert_eq!(stride, 2);

    let mut source = VecSource::new(4, 4, 600);
    let outcome = FrameSampler::new(stride, 1_000)
        .unwrap()
        .sample(&mut source)
        .unwrap();

    assert_eq!(outcome.samples.len(), 300);
    assert_eq!(outcome.stride, 2);
    assert_eq!(outcome.frames_read, 600);
    assert!(outcome.truncated.is_none());
    assert_eq!(source.converted, 300);

    let expected: Vec<u64> = (0..600).step_by(2).collect();
    assert_eq!(outcome.samples.source_indices(), expected);
}

#[test]
fn slower_source_keeps_every_frame() {
    let stride = sampling_stride(24.0, 30);
    assert_eq!(stride, 1);

    let mut source = VecSource::new(4, 4, 240);
    let outcome = FrameSampler::new(stride, 1_000)
        .unwrap()
        .sample(&mut source)
        .unwrap();

    assert_eq!(outcome.samples.len(), 240);
    let expected: Vec<u64> = (0..240).collect();
    assert_eq!(outcome.samples.source_indices(), expected);
}

#[test]
fn full_sheet_truncates_and_reports_dropped_frames() {
    // 1920x1080 tiles fit 8 x 15 = 120 under 16384x16384.
    let capacity = GridCapacity::plan(1920, 1080, TextureLimits::default()).unwrap();
    assert_eq!(capacity.max_frames(), 120);

    // 600 native frames at stride 2 would yield 300 samples.
    let mut source = VecSource::new(1, 1, 600);
    let outcome = FrameSampler::new(2, capacity.max_frames())
        .unwrap()
        .sample(&mut source)
        .unwrap();

    assert_eq!(outcome.samples.len(), 120);
    assert_eq!(
        outcome.truncated,
        Some(Truncation {
            capacity: 120,
            dropped: 180,
        })
    );
    assert_eq!(outcome.frames_read, 600);
    // Frames past the cap are counted, never converted.
    assert_eq!(source.converted, 120);

    let expected: Vec<u64> = (0..240).step_by(2).collect();
    assert_eq!(outcome.samples.source_indices(), expected);
}

#[test]
fn samples_keep_temporal_order_and_pixels() {
    let mut source = VecSource::new(2, 2, 50);
    let outcome = FrameSampler::new(3, 10).unwrap().sample(&mut source).unwrap();

    let mut previous = None;
    for frame in &outcome.samples {
        assert_eq!(frame_index(frame.image()), frame.source_index());
        if let Some(previous) = previous {
            assert!(frame.source_index() > previous);
        }
        previous = Some(frame.source_index());
    }
    assert_eq!(outcome.samples.len(), 10);
    assert_eq!(outcome.truncated.map(|t| t.dropped), Some(7));
}

#[test]
fn decode_error_aborts_the_pass() {
    let mut source = VecSource::new(2, 2, 100);
    source.fail_at = Some(41);
    let result = FrameSampler::new(1, 1_000).unwrap().sample(&mut source);
    assert!(matches!(result, Err(CutsceneError::VideoDecode(_))));
    assert_eq!(source.position(), 41);
}

#[test]
fn empty_source_is_reported() {
    let mut source = VecSource::new(2, 2, 0);
    let result = FrameSampler::new(1, 10).unwrap().sample(&mut source);
    assert!(matches!(result, Err(CutsceneError::EmptySource)));
}
