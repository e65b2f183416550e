//! Write-then-rename staging for output artifacts.
//!
//! Every artifact is first written to a hidden temporary file in its
//! destination directory and only renamed over the final path once fully
//! written. An interrupted or failed write leaves nothing at the
//! destination; the temporary file is removed when dropped.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use tempfile::{Builder as TempFileBuilder, NamedTempFile};

use crate::error::CutsceneError;

pub(crate) struct StagedFile {
    temp_file: NamedTempFile,
    destination: PathBuf,
}

impl StagedFile {
    /// Create a staging file next to `destination`, creating directories.
    pub(crate) fn new(destination: &Path) -> Result<Self, CutsceneError> {
        let directory = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(directory)
            .map_err(|error| CutsceneError::output_write(destination, error))?;

        let name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_file = TempFileBuilder::new()
            .prefix(&format!(".{name}."))
            .suffix(".partial")
            .tempfile_in(directory)
            .map_err(|error| CutsceneError::output_write(destination, error))?;

        Ok(Self {
            temp_file,
            destination: destination.to_path_buf(),
        })
    }

    /// Path of the staging file, for writers that need a path.
    pub(crate) fn path(&self) -> &Path {
        self.temp_file.path()
    }

    pub(crate) fn file_mut(&mut self) -> &mut File {
        self.temp_file.as_file_mut()
    }

    /// Rename the staging file over the destination.
    pub(crate) fn commit(self) -> Result<PathBuf, CutsceneError> {
        let StagedFile {
            temp_file,
            destination,
        } = self;
        temp_file
            .persist(&destination)
            .map_err(|error| CutsceneError::output_write(&destination, error.error))?;
        log::debug!("Wrote {}", destination.display());
        Ok(destination)
    }
}
