//! Sprite sheet composition.
//!
//! [`SpriteSheetComposer`] copies each sampled frame verbatim into its grid
//! cell of a single RGB raster. There is no scaling and no blending: cell
//! `i` of the sheet is pixel-for-pixel sample `i`, and cells past the last
//! sample stay black.

use std::io::{BufWriter, Write};
use std::path::Path;

use image::{GenericImage, RgbImage, codecs::png::PngEncoder, imageops};

use crate::configuration::CutsceneOptions;
use crate::error::CutsceneError;
use crate::layout::GridLayout;
use crate::progress::OperationType;
use crate::sampler::SampleSet;
use crate::staging::StagedFile;

/// The composed raster.
pub type SpriteSheet = RgbImage;

/// Places sampled frames into a grid and extracts them back out.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteSheetComposer;

impl SpriteSheetComposer {
    /// Compose `samples` into a `layout.grid_width`×`layout.grid_height`
    /// raster.
    pub fn compose(samples: &SampleSet, layout: &GridLayout) -> Result<SpriteSheet, CutsceneError> {
        Self::compose_with_options(samples, layout, &CutsceneOptions::default())
    }

    /// Compose with progress reporting and cancellation.
    ///
    /// Every frame is checked against the tile size before the raster is
    /// allocated.
    ///
    /// # Errors
    ///
    /// - [`CutsceneError::DimensionMismatch`] for the first frame whose size
    ///   differs from the layout's tile size.
    /// - [`CutsceneError::Configuration`] if there are more samples than
    ///   cells.
    /// - [`CutsceneError::Cancelled`] if the token fires between tiles.
    pub fn compose_with_options(
        samples: &SampleSet,
        layout: &GridLayout,
        options: &CutsceneOptions,
    ) -> Result<SpriteSheet, CutsceneError> {
        if samples.len() > layout.cell_count() {
            return Err(CutsceneError::Configuration(format!(
                "{} frames do not fit a {}x{} grid",
                samples.len(),
                layout.columns,
                layout.rows
            )));
        }

        for (index, frame) in samples.iter().enumerate() {
            let (actual_width, actual_height) = frame.dimensions();
            if actual_width != layout.tile_width || actual_height != layout.tile_height {
                return Err(CutsceneError::DimensionMismatch {
                    index,
                    expected_width: layout.tile_width,
                    expected_height: layout.tile_height,
                    actual_width,
                    actual_height,
                });
            }
        }

        let mut tracker =
            options.tracker(OperationType::Composition, Some(samples.len() as u64));
        let mut sheet = RgbImage::new(layout.grid_width, layout.grid_height);

        for (index, frame) in samples.iter().enumerate() {
            if options.is_cancelled() {
                return Err(CutsceneError::Cancelled);
            }
            let (x, y) = layout.cell_origin(index).ok_or_else(|| {
                CutsceneError::Configuration(format!("tile {index} lies outside the grid"))
            })?;
            sheet.copy_from(frame.image(), x, y).map_err(|error| {
                CutsceneError::Configuration(format!("tile {index} does not fit: {error}"))
            })?;
            tracker.advance(Some(frame.source_index()));
        }

        tracker.finish();
        Ok(sheet)
    }

    /// Crop tile `index` back out of a composed sheet.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::Configuration`] if `index` is past the last
    /// cell or the sheet is smaller than the layout.
    pub fn tile(
        sheet: &SpriteSheet,
        layout: &GridLayout,
        index: usize,
    ) -> Result<RgbImage, CutsceneError> {
        if sheet.dimensions() != (layout.grid_width, layout.grid_height) {
            return Err(CutsceneError::Configuration(format!(
                "sheet is {}x{}, layout expects {}x{}",
                sheet.width(),
                sheet.height(),
                layout.grid_width,
                layout.grid_height
            )));
        }
        let (x, y) = layout.cell_origin(index).ok_or_else(|| {
            CutsceneError::Configuration(format!(
                "tile index {index} is outside a {}x{} grid",
                layout.columns, layout.rows
            ))
        })?;
        Ok(imageops::crop_imm(sheet, x, y, layout.tile_width, layout.tile_height).to_image())
    }

    /// Encode `sheet` as PNG at `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::OutputWrite`] on any encoder or filesystem
    /// failure; nothing is left at `path` in that case.
    pub fn save_png(sheet: &SpriteSheet, path: &Path) -> Result<(), CutsceneError> {
        Self::stage_png(sheet, path)?.commit()?;
        Ok(())
    }

    /// Encode `sheet` into a staging file for `path` without committing it.
    pub(crate) fn stage_png(sheet: &SpriteSheet, path: &Path) -> Result<StagedFile, CutsceneError> {
        let mut staged = StagedFile::new(path)?;
        {
            let mut writer = BufWriter::new(staged.file_mut());
            sheet
                .write_with_encoder(PngEncoder::new(&mut writer))
                .map_err(|error| CutsceneError::output_write(path, error))?;
            writer
                .flush()
                .map_err(|error| CutsceneError::output_write(path, error))?;
        }
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;
    use crate::configuration::TextureLimits;
    use crate::layout::GridCapacity;
    use crate::sampler::SampledFrame;

    fn solid(width: u32, height: u32, shade: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([shade, shade / 2, 255 - shade]))
    }

    fn samples(count: usize, width: u32, height: u32) -> SampleSet {
        let frames = (0..count)
            .map(|index| SampledFrame::new(solid(width, height, (index * 30) as u8), index as u64 * 2))
            .collect();
        SampleSet::from_frames(frames).unwrap()
    }

    #[test]
    fn tiles_round_trip_and_blank_cell_is_black() {
        let layout = GridCapacity::plan(4, 3, TextureLimits::new(16, 64))
            .unwrap()
            .finalize(7)
            .unwrap();
        let set = samples(7, 4, 3);
        let sheet = SpriteSheetComposer::compose(&set, &layout).unwrap();
        assert_eq!(sheet.dimensions(), (16, 6));

        for (index, frame) in set.iter().enumerate() {
            let tile = SpriteSheetComposer::tile(&sheet, &layout, index).unwrap();
            assert_eq!(&tile, frame.image());
        }

        let blank = SpriteSheetComposer::tile(&sheet, &layout, 7).unwrap();
        assert!(blank.pixels().all(|pixel| pixel.0 == [0, 0, 0]));
    }

    #[test]
    fn mismatched_tile_is_reported_with_its_index() {
        let layout = GridCapacity::plan(4, 3, TextureLimits::default())
            .unwrap()
            .finalize(2)
            .unwrap();
        let frames = vec![
            SampledFrame::new(solid(4, 3, 10), 0),
            SampledFrame::new(solid(5, 3, 10), 1),
        ];
        let set = SampleSet::from_frames(frames).unwrap();
        match SpriteSheetComposer::compose(&set, &layout) {
            Err(CutsceneError::DimensionMismatch {
                index,
                actual_width,
                ..
            }) => {
                assert_eq!(index, 1);
                assert_eq!(actual_width, 5);
            }
            other => panic!("expected a dimension mismatch, got {other:?}"),
        }
    }

    #[test]
    fn tile_outside_grid_is_rejected() {
        let layout = GridCapacity::plan(2, 2, TextureLimits::default())
            .unwrap()
            .finalize(3)
            .unwrap();
        let sheet = SpriteSheetComposer::compose(&samples(3, 2, 2), &layout).unwrap();
        assert!(matches!(
            SpriteSheetComposer::tile(&sheet, &layout, 3),
            Err(CutsceneError::Configuration(_))
        ));
    }

    #[test]
    fn saved_png_decodes_to_the_same_pixels() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("images").join("intro.png");
        let layout = GridCapacity::plan(3, 3, TextureLimits::new(9, 9))
            .unwrap()
            .finalize(5)
            .unwrap();
        let sheet = SpriteSheetComposer::compose(&samples(5, 3, 3), &layout).unwrap();

        SpriteSheetComposer::save_png(&sheet, &path).unwrap();
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded, sheet);
    }
}
