//! Asset directory convention and artifact file names.
//!
//! A game project keeps its assets under one root:
//!
//! ```text
//! {root}/videos/intro.mp4          source
//! {root}/images/intro.png          sprite sheet
//! {root}/images/intro_metadata.json
//! {root}/music/intro_audio.wav
//! ```

use std::path::{Component, Path, PathBuf};

use crate::error::CutsceneError;

/// Asset root used when none is given.
pub const DEFAULT_ASSETS_ROOT: &str = "../assets";

/// The directory layout of an asset tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    root: PathBuf,
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self::new(DEFAULT_ASSETS_ROOT)
    }
}

impl AssetLayout {
    /// Use `root` as the asset root.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// The asset root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where source videos live.
    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    /// Where sheets and metadata are written.
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Where audio tracks are written.
    pub fn music_dir(&self) -> PathBuf {
        self.root.join("music")
    }

    /// Full path of the source video named `video`.
    pub fn source_path(&self, video: &str) -> PathBuf {
        self.videos_dir().join(video)
    }

    /// Output paths for the source video named `video`.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::Configuration`] if `video` has no usable
    /// base name.
    pub fn artifacts(&self, video: &str) -> Result<ArtifactPaths, CutsceneError> {
        let base = basename(video)?;
        Ok(ArtifactPaths::new(self.images_dir(), self.music_dir(), base))
    }
}

/// Derive the artifact base name from a source file name.
///
/// One trailing `.mp4` is removed; other extensions are kept as part of the
/// name. A relative subdirectory is kept, so videos with the same file name
/// in different folders do not overwrite each other's artifacts.
///
/// ```
/// use cutscene::basename;
///
/// assert_eq!(basename("intro.mp4")?, "intro");
/// assert_eq!(basename("boss/fight.mp4")?, "boss/fight");
/// assert_eq!(basename("ending.mov")?, "ending.mov");
/// # Ok::<(), cutscene::CutsceneError>(())
/// ```
///
/// # Errors
///
/// Returns [`CutsceneError::Configuration`] for an empty name, a name
/// ending in a separator, an absolute path, or one that climbs out of the
/// output directory with `..`.
pub fn basename(video: &str) -> Result<&str, CutsceneError> {
    let base = video.strip_suffix(".mp4").unwrap_or(video);
    let base = base.strip_prefix("./").unwrap_or(base);
    let unusable = |reason: &str| {
        Err(CutsceneError::Configuration(format!(
            "cannot derive an output name from `{video}`: {reason}"
        )))
    };

    if base.is_empty() || base.ends_with(['/', '\\']) {
        return unusable("no file name");
    }
    let path = Path::new(base);
    if path.has_root() || path.is_absolute() {
        return unusable("absolute path");
    }
    if path
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
    {
        return unusable("path leaves the output directory");
    }
    Ok(base)
}

/// Where the three artifacts of one bake are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `{base}.png`
    pub sheet: PathBuf,
    /// `{base}_metadata.json`
    pub metadata: PathBuf,
    /// `{base}_audio.wav`
    pub audio: PathBuf,
}

impl ArtifactPaths {
    /// Sheet and metadata in `images_dir`, audio in `music_dir`.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(images_dir: P, music_dir: Q, base: &str) -> Self {
        let images_dir = images_dir.as_ref();
        Self {
            sheet: images_dir.join(format!("{base}.png")),
            metadata: images_dir.join(format!("{base}_metadata.json")),
            audio: music_dir.as_ref().join(format!("{base}_audio.wav")),
        }
    }

    /// All three artifacts in one directory.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::Configuration`] if `base` is empty.
    pub fn in_directory<P: AsRef<Path>>(directory: P, base: &str) -> Result<Self, CutsceneError> {
        if base.is_empty() {
            return Err(CutsceneError::Configuration(
                "artifact base name must not be empty".to_string(),
            ));
        }
        let directory = directory.as_ref();
        Ok(Self::new(directory, directory, base))
    }
}
