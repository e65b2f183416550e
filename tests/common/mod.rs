//! Shared helpers for integration tests.
//!
//! [`VecSource`] is an in-memory [`FrameSource`] so the sampling, layout and
//! composition stages can be exercised without FFmpeg fixtures.

#![allow(dead_code)]

use cutscene::{CutsceneError, FrameSource, NativeFrame};
use image::{Rgb, RgbImage};

pub const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";
pub const SILENT_VIDEO: &str = "tests/fixtures/sample_video_silent.mp4";

/// A frame whose pixels encode its native index, so tests can tell which
/// frame ended up in which cell.
pub fn indexed_frame(width: u32, height: u32, index: u64) -> RgbImage {
    let [low, high, ..] = (index as u32).to_le_bytes();
    RgbImage::from_pixel(width, height, Rgb([low, high, 0x5a]))
}

/// Reverse of [`indexed_frame`].
pub fn frame_index(image: &RgbImage) -> u64 {
    let Rgb([low, high, _]) = *image.get_pixel(0, 0);
    u64::from(u16::from_le_bytes([low, high]))
}

/// Yields `total` synthetic frames of one size.
pub struct VecSource {
    width: u32,
    height: u32,
    total: u64,
    position: u64,
    /// Frames converted to RGB so far.
    pub converted: u64,
    /// Fail with a decode error when this index is reached.
    pub fail_at: Option<u64>,
    /// Frames with these indices come out at the wrong size.
    pub odd_sized: Vec<u64>,
}

impl VecSource {
    pub fn new(width: u32, height: u32, total: u64) -> Self {
        Self {
            width,
            height,
            total,
            position: 0,
            converted: 0,
            fail_at: None,
            odd_sized: Vec::new(),
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self, capture: bool) -> Result<Option<NativeFrame>, CutsceneError> {
        if self.position == self.total {
            return Ok(None);
        }
        let index = self.position;
        if self.fail_at == Some(index) {
            return Err(CutsceneError::VideoDecode(format!("corrupt frame {index}")));
        }
        self.position += 1;
        if !capture {
            return Ok(Some(NativeFrame::Skipped));
        }
        self.converted += 1;
        let width = if self.odd_sized.contains(&index) {
            self.width + 1
        } else {
            self.width
        };
        Ok(Some(NativeFrame::Captured(indexed_frame(
            width,
            self.height,
            index,
        ))))
    }

    fn count_remaining(&mut self) -> Result<u64, CutsceneError> {
        let remaining = self.total - self.position;
        self.position = self.total;
        Ok(remaining)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}
