//! Reelsmith CLI: compose narrated reels from a plan and its assets.
//!
//! Usage:
//!   reelsmith compose [OPTIONS]   Render the plan to video + subtitles
//!   reelsmith validate [OPTIONS]  Check the plan and its assets
//!   reelsmith info [OPTIONS]      Show plan information
//!   reelsmith check               Check for ffmpeg/ffprobe
//!   reelsmith init                Write the default config file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reelsmith_common::config::AppConfig;
use reelsmith_common::error::ReelError;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelsmith",
    about = "Compose narrated slide and video reels with aligned subtitles",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Visual source for every clip in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Still images from the images directory
    Slides,
    /// Provider-generated clips from the videos directory
    Video,
}

/// Input locations. Unset paths fall back to the configured outputs tree.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Plan JSON file
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Directory of clip<N>.png images
    #[arg(long)]
    images: Option<PathBuf>,

    /// Directory of clip<N>.mp4 provider videos
    #[arg(long)]
    videos: Option<PathBuf>,

    /// Directory of clip<N> narration files
    #[arg(long)]
    audio: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ComposeArgs {
    /// Composition mode
    #[arg(long, value_enum, default_value = "slides")]
    mode: ModeArg,

    #[command(flatten)]
    inputs: InputArgs,

    /// Exact output file (overrides --outdir)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for auto-numbered output files
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Only compose the first N clips
    #[arg(long, value_parser = parse_clip_count)]
    clips: Option<usize>,

    /// Fixed slide duration in seconds (slides mode)
    #[arg(long, conflicts_with = "paced")]
    slide_duration: Option<f64>,

    /// Size each slide to its narration plus padding (slides mode)
    #[arg(long)]
    paced: bool,

    /// Lengthen fixed slides whose narration runs over instead of cutting it
    #[arg(long)]
    extend_slides: bool,

    /// Hold the last frame instead of fading to black (video mode)
    #[arg(long)]
    freeze: bool,

    /// Output frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Output width
    #[arg(long)]
    width: Option<u32>,

    /// Output height
    #[arg(long)]
    height: Option<u32>,

    /// Silence before narration in paced slides (seconds)
    #[arg(long)]
    pad_before: Option<f64>,

    /// Silence after narration in paced slides (seconds)
    #[arg(long)]
    pad_after: Option<f64>,

    /// Length of a paced slide without narration (seconds)
    #[arg(long)]
    fallback_duration: Option<f64>,

    /// Fade-out window before black padding (seconds)
    #[arg(long)]
    fade: Option<f64>,

    /// Width of the synthetic black frame
    #[arg(long)]
    black_width: Option<u32>,

    /// Height of the synthetic black frame
    #[arg(long)]
    black_height: Option<u32>,

    /// Final video bitrate in kbps
    #[arg(long)]
    video_bitrate: Option<u32>,

    /// Final audio bitrate in kbps
    #[arg(long)]
    audio_bitrate: Option<u32>,

    /// Audio sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Also write a WebVTT sidecar
    #[arg(long)]
    vtt: bool,

    /// Print the reconciled timeline and subtitles without rendering
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a plan to video plus subtitles
    Compose(ComposeArgs),

    /// Validate a plan and check its assets
    Validate {
        /// Mode whose visual assets are required
        #[arg(long, value_enum, default_value = "slides")]
        mode: ModeArg,

        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Show plan information
    Info {
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Check system capabilities
    Check,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (mut config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    reelsmith_common::logging::init_logging(&config.logging);
    if let Some(err) = load_error {
        tracing::warn!("{err}; using default configuration");
    }

    let result = match cli.command {
        Commands::Compose(args) => commands::compose::run(&config, args).await,
        Commands::Validate { mode, inputs } => commands::validate::run(&config, mode, &inputs),
        Commands::Info { inputs } => commands::info::run(&config, &inputs),
        Commands::Check => commands::check::run(&config),
        Commands::Init { force } => commands::init::run(&config, force),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(exit_code(&err));
    }
}

fn parse_clip_count(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("clip count must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Exit status for a failed command: the failing tool's status when there
/// is one, otherwise 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ReelError>()
        .map(ReelError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compose_flags_parse() {
        let cli = Cli::try_parse_from([
            "reelsmith", "compose", "--mode", "video", "--clips", "3", "--freeze", "--vtt",
            "--out", "final.mp4",
        ])
        .unwrap();
        match cli.command {
            Commands::Compose(args) => {
                assert_eq!(args.mode, ModeArg::Video);
                assert_eq!(args.clips, Some(3));
                assert!(args.freeze && args.vtt);
                assert_eq!(args.out, Some(PathBuf::from("final.mp4")));
            }
            _ => panic!("expected compose"),
        }
    }

    #[test]
    fn test_paced_conflicts_with_fixed_duration() {
        let parsed = Cli::try_parse_from([
            "reelsmith", "compose", "--paced", "--slide-duration", "8",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_zero_clip_count_rejected() {
        assert!(Cli::try_parse_from(["reelsmith", "compose", "--clips", "0"]).is_err());
        assert!(Cli::try_parse_from(["reelsmith", "compose", "--clips", "1"]).is_ok());
    }

    #[test]
    fn test_exit_code_uses_tool_status() {
        let err: anyhow::Error = ReelError::Tool {
            program: "ffmpeg".to_string(),
            code: Some(69),
            stderr: String::new(),
        }
        .for_clip(2)
        .into();
        assert_eq!(exit_code(&err), 69);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }
}
