//! Recast CLI — Command-line interface for recording post-processing.
//!
//! Usage:
//!   recast process <INPUT> [OPTIONS]   Process a recording into a final video
//!   recast probe <INPUT>               Show stream metadata for a recording
//!   recast check                       Check that ffmpeg and ffprobe are usable

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "recast",
    about = "Screen recording post-processing: cursor overlay, click glow, camera zoom",
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

#[derive(Subcommand)]
enum Commands {
    /// Process a recording into a final video
    Process {
        /// Path to the source recording
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON file with the recorded cursor samples
        #[arg(long)]
        samples: Option<PathBuf>,

        /// JSON file with the zoom windows to apply
        #[arg(long)]
        zooms: Option<PathBuf>,

        /// Cursor sprite style
        #[arg(long, default_value = "normal")]
        style: String,

        /// x264 encoder preset
        #[arg(long)]
        preset: Option<String>,

        /// x264 constant rate factor
        #[arg(long)]
        crf: Option<u32>,
    },

    /// Show stream metadata for a recording
    Probe {
        /// Path to the recording
        input: PathBuf,
    },

    /// Check that ffmpeg and ffprobe are usable
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = recast_common::EngineConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    recast_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Process {
            input,
            output,
            samples,
            zooms,
            style,
            preset,
            crf,
        } => {
            if let Some(preset) = preset {
                config.transcode.preset = preset;
            }
            if let Some(crf) = crf {
                config.transcode.crf = crf;
            }
            commands::process::run(config, input, output, samples, zooms, style).await
        }
        Commands::Probe { input } => commands::probe::run(&config, input).await,
        Commands::Check => commands::check::run(&config).await,
    }
}
