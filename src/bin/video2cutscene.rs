use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use colored::Colorize;
use cutscene::{
    AssetLayout, AudioOutcome, AudioPolicy, BakeReport, CutsceneOptions, CutscenePipeline,
    DEFAULT_ASSETS_ROOT, DEFAULT_TARGET_FPS, DEFAULT_TEXTURE_LIMIT, FfmpegLogLevel,
    OperationType, ProgressCallback, ProgressInfo, TextureLimits,
};
use indicatif::{ProgressBar, ProgressStyle};

const CLI_AFTER_HELP: &str = "Examples:\n  video2cutscene intro.mp4\n  video2cutscene ending.mp4 --assets game/assets --progress\n  video2cutscene boss.mp4 --fps 24 --max-width 8192 --max-height 8192 --no-audio\n\nExit status: 0 on success, 2 if the sheet was written but audio failed, 1 on error.";

#[derive(Debug, Parser)]
#[command(
    name = "video2cutscene",
    version,
    about = "Bake a video into a sprite sheet, a layout record, and a WAV track",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Video file name inside `{assets}/videos`, optionally in a
    /// subfolder. A trailing `.mp4` is dropped to name the outputs.
    video: String,

    /// Asset root holding `videos/`, `images/` and `music/`.
    #[arg(long, default_value = DEFAULT_ASSETS_ROOT)]
    assets: PathBuf,

    /// Output frame rate.
    #[arg(long, default_value_t = DEFAULT_TARGET_FPS)]
    fps: u32,

    /// Sprite sheet width ceiling in pixels.
    #[arg(long, default_value_t = DEFAULT_TEXTURE_LIMIT)]
    max_width: u32,

    /// Sprite sheet height ceiling in pixels.
    #[arg(long, default_value_t = DEFAULT_TEXTURE_LIMIT)]
    max_height: u32,

    /// Show debug logging.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, default_value = "error")]
    log_level: FfmpegLogLevel,

    /// Do not extract the audio track.
    #[arg(long, conflicts_with = "require_audio")]
    no_audio: bool,

    /// Fail the whole run if the audio track cannot be extracted.
    #[arg(long)]
    require_audio: bool,
}

impl Cli {
    fn audio_policy(&self) -> AudioPolicy {
        if self.no_audio {
            AudioPolicy::Skip
        } else if self.require_audio {
            AudioPolicy::Required
        } else {
            AudioPolicy::BestEffort
        }
    }

    fn options(&self) -> CutsceneOptions {
        let mut options = CutsceneOptions::new()
            .with_target_fps(self.fps)
            .with_texture_limits(TextureLimits::new(self.max_width, self.max_height))
            .with_audio_policy(self.audio_policy());
        if self.progress {
            options = options
                .with_progress(Arc::new(TerminalProgress::new()))
                .with_batch_size(10);
        }
        options
    }
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} {msg:<10} {bar:40.cyan/blue} {pos}/{len}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        Self { bar }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let stage = match info.operation {
            OperationType::FrameSampling => "sampling",
            OperationType::Composition => "composing",
            OperationType::AudioExtraction => "audio",
            _ => "working",
        };
        self.bar.set_message(stage);
        match info.total {
            Some(total) => self.bar.set_length(total.max(info.current)),
            None => self.bar.set_length(info.current),
        }
        self.bar.set_position(info.current);
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn print_summary(report: &BakeReport) {
    if let Some(truncation) = report.truncated {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!(
                "sheet capacity of {} frames reached; {} later frames were dropped",
                truncation.capacity, truncation.dropped
            )
            .yellow()
        );
    }

    println!(
        "{} {} frames in a {}x{} grid ({}x{} px)",
        "baked".green().bold(),
        report.sample_count,
        report.layout.columns,
        report.layout.rows,
        report.layout.grid_width,
        report.layout.grid_height
    );
    println!("{} {}", "saved".green().bold(), report.sheet_path.display());
    println!("{} {}", "saved".green().bold(), report.metadata_path.display());

    match &report.audio {
        AudioOutcome::Written(track) => {
            println!("{} {}", "saved".green().bold(), track.path.display());
        }
        AudioOutcome::Failed(error) => {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("no audio track written: {error}").yellow()
            );
        }
        AudioOutcome::Skipped => {}
    }
}

fn run() -> Result<BakeReport, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    cutscene::set_ffmpeg_log_level(cli.log_level);

    let assets = AssetLayout::new(&cli.assets);
    let source = assets.source_path(&cli.video);
    let artifacts = assets.artifacts(&cli.video)?;

    let pipeline = CutscenePipeline::new(cli.options())?;
    let report = pipeline.bake(&source, &artifacts)?;
    // Clears the progress bar before the summary is printed.
    drop(pipeline);
    print_summary(&report);
    Ok(report)
}

/// 0 for a complete bake, 2 when the sheet was written but audio failed.
fn exit_code(report: &BakeReport) -> i32 {
    if report.is_complete() { 0 } else { 2 }
}

fn main() {
    match run() {
        Ok(report) => std::process::exit(exit_code(&report)),
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use cutscene::{CutsceneError, GridCapacity};

    use super::*;

    #[test]
    fn defaults_match_library_constants() {
        let cli = Cli::try_parse_from(["video2cutscene", "intro.mp4"]).unwrap();
        assert_eq!(cli.video, "intro.mp4");
        assert_eq!(cli.assets, PathBuf::from("../assets"));
        assert_eq!(cli.fps, 30);
        assert_eq!((cli.max_width, cli.max_height), (16_384, 16_384));
        assert_eq!(cli.log_level, FfmpegLogLevel::Error);
        assert_eq!(cli.audio_policy(), AudioPolicy::BestEffort);
    }

    fn report_with(audio: AudioOutcome) -> BakeReport {
        let layout = GridCapacity::plan(8, 8, TextureLimits::default())
            .unwrap()
            .finalize(1)
            .unwrap();
        BakeReport {
            sheet_path: PathBuf::from("intro.png"),
            metadata_path: PathBuf::from("intro_metadata.json"),
            layout,
            sample_count: 1,
            stride: 1,
            frames_read: 1,
            truncated: None,
            audio,
        }
    }

    #[test]
    fn failed_audio_exits_with_partial_status() {
        let failed = report_with(AudioOutcome::Failed(CutsceneError::AudioExtraction(
            "No audio stream found in source".to_string(),
        )));
        assert_eq!(exit_code(&failed), 2);
        assert_eq!(exit_code(&report_with(AudioOutcome::Skipped)), 0);
    }

    #[test]
    fn missing_video_is_a_usage_error() {
        assert!(Cli::try_parse_from(["video2cutscene"]).is_err());
    }

    #[test]
    fn audio_flags_select_policy() {
        let cli = Cli::try_parse_from(["video2cutscene", "a.mp4", "--no-audio"]).unwrap();
        assert_eq!(cli.audio_policy(), AudioPolicy::Skip);

        let cli = Cli::try_parse_from(["video2cutscene", "a.mp4", "--require-audio"]).unwrap();
        assert_eq!(cli.audio_policy(), AudioPolicy::Required);

        assert!(
            Cli::try_parse_from(["video2cutscene", "a.mp4", "--no-audio", "--require-audio"])
                .is_err()
        );
    }

    #[test]
    fn overrides_reach_options() {
        let cli = Cli::try_parse_from([
            "video2cutscene",
            "a.mp4",
            "--fps",
            "24",
            "--max-width",
            "4096",
            "--max-height",
            "2048",
            "--log-level",
            "warn",
        ])
        .unwrap();
        let options = cli.options();
        assert_eq!(options.target_fps(), 24);
        assert_eq!(options.texture_limits(), TextureLimits::new(4096, 2048));
        assert_eq!(cli.log_level, FfmpegLogLevel::Warning);
    }
}
