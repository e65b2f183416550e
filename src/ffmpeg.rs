//! FFmpeg library setup and log level configuration.
//!
//! FFmpeg prints its own warnings to stderr independently of the Rust
//! [`log`](https://crates.io/crates/log) facade. A bake decodes every native
//! frame, so a damaged stream can produce thousands of lines; this module
//! lets callers tune that output without importing `ffmpeg-next`.
//!
//! ```no_run
//! use cutscene::FfmpegLogLevel;
//!
//! let level: FfmpegLogLevel = "error".parse().unwrap();
//! cutscene::set_ffmpeg_log_level(level);
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    str::FromStr,
};

use ffmpeg_next::util::{error::EAGAIN, log::Level};

use crate::error::CutsceneError;

/// FFmpeg internal log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Unrecoverable conditions that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Extremely verbose tracing.
    Trace,
}

impl FfmpegLogLevel {
    const NAMES: [(&'static str, FfmpegLogLevel); 9] = [
        ("quiet", FfmpegLogLevel::Quiet),
        ("panic", FfmpegLogLevel::Panic),
        ("fatal", FfmpegLogLevel::Fatal),
        ("error", FfmpegLogLevel::Error),
        ("warning", FfmpegLogLevel::Warning),
        ("info", FfmpegLogLevel::Info),
        ("verbose", FfmpegLogLevel::Verbose),
        ("debug", FfmpegLogLevel::Debug),
        ("trace", FfmpegLogLevel::Trace),
    ];

    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

impl Display for FfmpegLogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = Self::NAMES
            .iter()
            .find(|(_, level)| level == self)
            .map_or("unknown", |(name, _)| *name);
        f.write_str(name)
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let lowered = if lowered == "warn" { "warning".to_string() } else { lowered };
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, level)| *level)
            .ok_or_else(|| {
                format!(
                    "unknown FFmpeg log level `{value}` (expected one of quiet, panic, fatal, error, warning, info, verbose, debug, trace)"
                )
            })
    }
}

/// Set FFmpeg's own stderr verbosity. Does not affect the `log` facade.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Initialise FFmpeg (idempotent) on behalf of an open of `path`.
pub(crate) fn initialize(path: &Path) -> Result<(), CutsceneError> {
    ffmpeg_next::init().map_err(|error| CutsceneError::SourceOpen {
        path: path.to_path_buf(),
        reason: format!("FFmpeg initialisation failed: {error}"),
    })
}

/// Classify the result of a `receive_frame` / `receive_packet` call.
///
/// `Ok(true)` when something was received. `Ok(false)` when the codec wants
/// more input (`EAGAIN`) or is fully drained (`Eof`). Any other error is a
/// real failure and is passed through.
pub(crate) fn received(
    result: Result<(), ffmpeg_next::Error>,
) -> Result<bool, ffmpeg_next::Error> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Other { errno: EAGAIN }) | Err(ffmpeg_next::Error::Eof) => {
            Ok(false)
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_input_and_drained_are_not_failures() {
        assert_eq!(received(Ok(())), Ok(true));
        assert_eq!(received(Err(ffmpeg_next::Error::Other { errno: EAGAIN })), Ok(false));
        assert_eq!(received(Err(ffmpeg_next::Error::Eof)), Ok(false));
    }

    #[test]
    fn decoder_failures_are_passed_through() {
        assert_eq!(
            received(Err(ffmpeg_next::Error::InvalidData)),
            Err(ffmpeg_next::Error::InvalidData)
        );
        let out_of_memory = ffmpeg_next::Error::Other {
            errno: ffmpeg_next::util::error::ENOMEM,
        };
        assert_eq!(received(Err(out_of_memory)), Err(out_of_memory));
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("ERROR".parse(), Ok(FfmpegLogLevel::Error));
        assert_eq!("warn".parse(), Ok(FfmpegLogLevel::Warning));
        assert_eq!(" quiet ".parse(), Ok(FfmpegLogLevel::Quiet));
        assert!("loud".parse::<FfmpegLogLevel>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for (_, level) in FfmpegLogLevel::NAMES {
            assert_eq!(level.to_string().parse(), Ok(level));
        }
    }
}
