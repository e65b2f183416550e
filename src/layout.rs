//! Two-phase grid planning.
//!
//! The number of tiles a sheet can hold depends on the tile size, which is
//! known as soon as the source is opened, while the final grid shape depends
//! on how many frames the sampler actually kept. Planning is therefore split:
//!
//! 1. [`GridCapacity::plan`] runs before sampling and yields the hard frame
//!    cap handed to the [`FrameSampler`](crate::FrameSampler).
//! 2. [`GridCapacity::finalize`] runs after sampling and yields the
//!    [`GridLayout`] used by the composer and the metadata record.
//!
//! ```
//! use cutscene::{GridCapacity, TextureLimits};
//!
//! let capacity = GridCapacity::plan(1920, 1080, TextureLimits::default())?;
//! assert_eq!(capacity.max_frames(), 120);
//!
//! let layout = capacity.finalize(7)?;
//! assert_eq!((layout.columns, layout.rows), (7, 1));
//! # Ok::<(), cutscene::CutsceneError>(())
//! ```

use crate::configuration::TextureLimits;
use crate::error::CutsceneError;

/// Phase one: how many tiles of a given size fit under the texture ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCapacity {
    tile_width: u32,
    tile_height: u32,
    max_columns: u32,
    max_rows: u32,
    limits: TextureLimits,
}

impl GridCapacity {
    /// Compute the capacity bound for `tile_width`×`tile_height` tiles.
    ///
    /// At least one column and one row are always allowed, so a tile wider
    /// or taller than the ceiling still produces a (single-tile-wide) sheet;
    /// [`exceeds_limits`](GridCapacity::exceeds_limits) reports that case.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::Configuration`] when either tile dimension
    /// or either ceiling is zero.
    pub fn plan(
        tile_width: u32,
        tile_height: u32,
        limits: TextureLimits,
    ) -> Result<Self, CutsceneError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(CutsceneError::Configuration(format!(
                "tile dimensions must be positive (got {tile_width}x{tile_height})"
            )));
        }
        if limits.width == 0 || limits.height == 0 {
            return Err(CutsceneError::Configuration(format!(
                "texture ceiling must be positive (got {}x{})",
                limits.width, limits.height
            )));
        }

        let capacity = Self {
            tile_width,
            tile_height,
            max_columns: (limits.width / tile_width).max(1),
            max_rows: (limits.height / tile_height).max(1),
            limits,
        };

        log::debug!(
            "Grid capacity for {}x{} tiles under {}x{}: {} columns x {} rows = {} frames",
            tile_width,
            tile_height,
            limits.width,
            limits.height,
            capacity.max_columns,
            capacity.max_rows,
            capacity.max_frames(),
        );

        Ok(capacity)
    }

    /// Width of one tile in pixels.
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Height of one tile in pixels.
    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Most columns that fit under the width ceiling (at least 1).
    pub fn max_columns(&self) -> u32 {
        self.max_columns
    }

    /// Most rows that fit under the height ceiling (at least 1).
    pub fn max_rows(&self) -> u32 {
        self.max_rows
    }

    /// The hard cap on sampled frames.
    pub fn max_frames(&self) -> usize {
        self.max_columns as usize * self.max_rows as usize
    }

    /// The ceiling this capacity was planned against.
    pub fn limits(&self) -> TextureLimits {
        self.limits
    }

    /// `true` when a single tile is already larger than the ceiling.
    pub fn exceeds_limits(&self) -> bool {
        self.tile_width > self.limits.width || self.tile_height > self.limits.height
    }

    /// Phase two: the final grid for `sample_count` frames.
    ///
    /// Fills rows left to right, using as many columns as there are samples
    /// up to the column cap. Cells past `sample_count` in the last row stay
    /// blank.
    ///
    /// # Errors
    ///
    /// - [`CutsceneError::EmptySource`] if `sample_count` is zero.
    /// - [`CutsceneError::Configuration`] if `sample_count` exceeds
    ///   [`max_frames`](GridCapacity::max_frames).
    pub fn finalize(&self, sample_count: usize) -> Result<GridLayout, CutsceneError> {
        if sample_count == 0 {
            return Err(CutsceneError::EmptySource);
        }
        if sample_count > self.max_frames() {
            return Err(CutsceneError::Configuration(format!(
                "{sample_count} frames exceed the grid capacity of {}",
                self.max_frames()
            )));
        }

        // Both fit in u32: columns <= max_columns, rows <= max_rows.
        let columns = sample_count.min(self.max_columns as usize) as u32;
        let rows = sample_count.div_ceil(columns as usize) as u32;

        Ok(GridLayout {
            columns,
            rows,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            grid_width: columns * self.tile_width,
            grid_height: rows * self.tile_height,
        })
    }
}

/// Phase two: the final arrangement of tiles in the sprite sheet.
///
/// Tile `i` sits at column `i % columns`, row `i / columns`. The metadata
/// record and any playback code rely on exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridLayout {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Width of one tile in pixels.
    pub tile_width: u32,
    /// Height of one tile in pixels.
    pub tile_height: u32,
    /// Raster width: `columns * tile_width`.
    pub grid_width: u32,
    /// Raster height: `rows * tile_height`.
    pub grid_height: u32,
}

impl GridLayout {
    /// Total number of cells, filled or blank.
    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Cells left blank when `sample_count` tiles are placed.
    pub fn blank_cells(&self, sample_count: usize) -> usize {
        self.cell_count().saturating_sub(sample_count)
    }

    /// `(column, row)` of tile `index`, or `None` past the last cell.
    pub fn cell(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.cell_count() {
            return None;
        }
        let columns = self.columns as usize;
        Some(((index % columns) as u32, (index / columns) as u32))
    }

    /// Pixel origin `(x, y)` of tile `index`, or `None` past the last cell.
    pub fn cell_origin(&self, index: usize) -> Option<(u32, u32)> {
        self.cell(index)
            .map(|(column, row)| (column * self.tile_width, row * self.tile_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> TextureLimits {
        TextureLimits::default()
    }

    #[test]
    fn full_hd_tiles_cap_at_120_frames() {
        let capacity = GridCapacity::plan(1920, 1080, limits()).unwrap();
        assert_eq!(capacity.max_columns(), 8);
        assert_eq!(capacity.max_rows(), 15);
        assert_eq!(capacity.max_frames(), 120);
        assert!(!capacity.exceeds_limits());
    }

    #[test]
    fn zero_tile_dimension_is_a_configuration_error() {
        assert!(matches!(
            GridCapacity::plan(0, 1080, limits()),
            Err(CutsceneError::Configuration(_))
        ));
        assert!(matches!(
            GridCapacity::plan(1920, 0, limits()),
            Err(CutsceneError::Configuration(_))
        ));
    }

    #[test]
    fn oversize_tile_still_gets_one_cell() {
        let capacity = GridCapacity::plan(20_000, 100, limits()).unwrap();
        assert_eq!(capacity.max_columns(), 1);
        assert!(capacity.exceeds_limits());
        let layout = capacity.finalize(3).unwrap();
        assert_eq!((layout.columns, layout.rows), (1, 3));
    }

    #[test]
    fn capacity_never_exceeds_ceiling() {
        let limits = TextureLimits::new(1000, 700);
        for tile_width in (1..=1000).step_by(37) {
            for tile_height in (1..=700).step_by(29) {
                let capacity = GridCapacity::plan(tile_width, tile_height, limits).unwrap();
                assert!(capacity.max_columns() * tile_width <= limits.width);
                assert!(capacity.max_rows() * tile_height <= limits.height);
            }
        }
    }

    #[test]
    fn seven_frames_over_four_columns() {
        let capacity = GridCapacity::plan(10, 10, TextureLimits::new(40, 100)).unwrap();
        assert_eq!(capacity.max_columns(), 4);

        let layout = capacity.finalize(7).unwrap();
        assert_eq!((layout.columns, layout.rows), (4, 2));
        assert_eq!((layout.grid_width, layout.grid_height), (40, 20));
        assert_eq!(layout.blank_cells(7), 1);
        assert_eq!(layout.cell(6), Some((2, 1)));
        assert_eq!(layout.cell_origin(7), Some((30, 10)));
        assert_eq!(layout.cell(8), None);
    }

    #[test]
    fn finalize_shape_holds_for_every_count() {
        let capacity = GridCapacity::plan(16, 9, TextureLimits::new(100, 50)).unwrap();
        for count in 1..=capacity.max_frames() {
            let layout = capacity.finalize(count).unwrap();
            assert_eq!(
                layout.columns as usize,
                count.min(capacity.max_columns() as usize)
            );
            assert_eq!(layout.rows as usize, count.div_ceil(layout.columns as usize));
            assert!(layout.cell_count() >= count);
            assert!(layout.grid_width <= 100 && layout.grid_height <= 50);
        }
    }

    #[test]
    fn finalize_rejects_empty_and_overfull() {
        let capacity = GridCapacity::plan(16, 9, TextureLimits::new(32, 18)).unwrap();
        assert!(matches!(capacity.finalize(0), Err(CutsceneError::EmptySource)));
        assert!(matches!(
            capacity.finalize(5),
            Err(CutsceneError::Configuration(_))
        ));
    }

    #[test]
    fn origins_follow_row_major_order() {
        let capacity = GridCapacity::plan(3, 2, TextureLimits::new(9, 100)).unwrap();
        let layout = capacity.finalize(10).unwrap();
        for index in 0..10 {
            let (x, y) = layout.cell_origin(index).unwrap();
            assert_eq!(x, (index as u32 % 3) * 3);
            assert_eq!(y, (index as u32 / 3) * 2);
        }
    }
}
