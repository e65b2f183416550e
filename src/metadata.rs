//! The JSON layout record that accompanies a sprite sheet.
//!
//! A [`SheetMetadata`] tells playback code where the raster lives, how it is
//! tiled, and in which order to show the tiles:
//!
//! ```json
//! {
//!     "filepath": "../assets/images/intro.png",
//!     "format": {
//!         "width": 15360,
//!         "height": 16200,
//!         "tileWidth": 1920,
//!         "tileHeight": 1080,
//!         "columns": 8,
//!         "rows": 15
//!     },
//!     "frames": {
//!         "video": [0, 1, 2]
//!     }
//! }
//! ```
//!
//! Serialization is deterministic (fixed key order, four-space indentation,
//! trailing newline), so identical bakes produce byte-identical records.

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::CutsceneError;
use crate::layout::GridLayout;
use crate::staging::StagedFile;

/// Raster and tile geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetFormat {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Tile columns.
    pub columns: u32,
    /// Tile rows.
    pub rows: u32,
}

/// Playback order of the tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameIndex {
    /// Tile indices in playback order, always `0..N`.
    pub video: Vec<usize>,
}

/// The full layout record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetMetadata {
    /// Path of the raster, exactly as it was written.
    pub filepath: String,
    /// Raster and tile geometry.
    pub format: SheetFormat,
    /// Playback order.
    pub frames: FrameIndex,
}

impl SheetMetadata {
    /// Describe a sheet at `filepath` holding `sample_count` tiles.
    pub fn new(filepath: impl Into<String>, layout: &GridLayout, sample_count: usize) -> Self {
        Self {
            filepath: filepath.into(),
            format: SheetFormat {
                width: layout.grid_width,
                height: layout.grid_height,
                tile_width: layout.tile_width,
                tile_height: layout.tile_height,
                columns: layout.columns,
                rows: layout.rows,
            },
            frames: FrameIndex {
                video: (0..sample_count).collect(),
            },
        }
    }

    /// Rebuild the grid this record describes.
    pub fn layout(&self) -> GridLayout {
        GridLayout {
            columns: self.format.columns,
            rows: self.format.rows,
            tile_width: self.format.tile_width,
            tile_height: self.format.tile_height,
            grid_width: self.format.width,
            grid_height: self.format.height,
        }
    }

    /// Number of tiles to play.
    pub fn frame_count(&self) -> usize {
        self.frames.video.len()
    }

    /// `(column, row)` of the tile shown at playback position `position`.
    pub fn cell_of(&self, position: usize) -> Option<(u32, u32)> {
        let tile = *self.frames.video.get(position)?;
        self.layout().cell(tile)
    }

    /// Serialize with four-space indentation and a trailing newline.
    pub fn to_json_string(&self) -> Result<String, CutsceneError> {
        let mut buffer = Vec::new();
        self.write_json(&mut buffer)?;
        String::from_utf8(buffer).map_err(|error| CutsceneError::InvalidMetadata(error.to_string()))
    }

    /// Serialize into `writer` in the canonical form.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), CutsceneError> {
        let mut serializer = Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)
            .map_err(|error| CutsceneError::InvalidMetadata(error.to_string()))?;
        let mut writer = serializer.into_inner();
        writer
            .write_all(b"\n")
            .map_err(|error| CutsceneError::InvalidMetadata(error.to_string()))
    }

    /// Write the record to `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::OutputWrite`] on filesystem failure.
    pub fn write(&self, path: &Path) -> Result<(), CutsceneError> {
        self.stage(path)?.commit()?;
        Ok(())
    }

    /// Serialize into a staging file for `path` without committing it.
    pub(crate) fn stage(&self, path: &Path) -> Result<StagedFile, CutsceneError> {
        let json = self.to_json_string()?;
        let mut staged = StagedFile::new(path)?;
        staged
            .file_mut()
            .write_all(json.as_bytes())
            .map_err(|error| CutsceneError::output_write(path, error))?;
        Ok(staged)
    }

    /// Parse a record from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::InvalidMetadata`] on malformed JSON, a
    /// missing key, or a geometry that does not add up.
    pub fn from_json_str(json: &str) -> Result<Self, CutsceneError> {
        let metadata: Self = serde_json::from_str(json)
            .map_err(|error| CutsceneError::InvalidMetadata(error.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Parse a record from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CutsceneError> {
        let metadata: Self = serde_json::from_reader(reader)
            .map_err(|error| CutsceneError::InvalidMetadata(error.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Read and parse the record at `path`.
    pub fn read(path: &Path) -> Result<Self, CutsceneError> {
        let file = File::open(path).map_err(|error| {
            CutsceneError::InvalidMetadata(format!("{}: {error}", path.display()))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    fn validate(&self) -> Result<(), CutsceneError> {
        let format = &self.format;
        if format.columns.checked_mul(format.tile_width) != Some(format.width)
            || format.rows.checked_mul(format.tile_height) != Some(format.height)
        {
            return Err(CutsceneError::InvalidMetadata(format!(
                "{}x{} raster does not match {} columns x {} rows of {}x{} tiles",
                format.width,
                format.height,
                format.columns,
                format.rows,
                format.tile_width,
                format.tile_height
            )));
        }
        let cells = format.columns as usize * format.rows as usize;
        if let Some(tile) = self.frames.video.iter().find(|&&tile| tile >= cells) {
            return Err(CutsceneError::InvalidMetadata(format!(
                "frame {tile} is outside a grid of {cells} cells"
            )));
        }
        Ok(())
    }
}
