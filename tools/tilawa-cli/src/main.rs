//! Tilawa CLI — Command-line interface for timeline inspection and export.
//!
//! Usage:
//!   tilawa info <PATH>       Show a segment list and its computed timeline
//!   tilawa probe <PATH>      Resolve audio durations with ffprobe
//!   tilawa export <PATH>     Export a timeline to video

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tilawa",
    about = "Recitation timelines: synchronized playback and frame-accurate export",
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
    /// Show a segment list and its computed timeline
    Info {
        /// Path to the segment-list JSON file
        path: PathBuf,

        /// Frame rate used for the frame-count summary
        #[arg(long, default_value = "25")]
        fps: u32,
    },

    /// Resolve audio durations with ffprobe and print the rebuilt timeline
    Probe {
        /// Path to the segment-list JSON file
        path: PathBuf,

        /// Per-asset probe timeout in seconds
        #[arg(long, default_value = "15")]
        timeout_secs: u64,

        /// Write the resolved durations back to the file
        #[arg(long)]
        write: bool,
    },

    /// Export a timeline to video
    Export {
        /// Path to the segment-list JSON file
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "mp4-h264")]
        format: String,

        /// Base export resolution
        #[arg(long, default_value = "1920x1080")]
        resolution: String,

        /// Presentation aspect ratio
        #[arg(long, default_value = "16:9")]
        aspect_ratio: String,

        /// Frames per second
        #[arg(long, default_value = "25")]
        fps: u32,

        /// Background color as #RRGGBB
        #[arg(long, default_value = "#000000")]
        background: String,

        /// Probe unresolved durations before exporting
        #[arg(long)]
        probe: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tilawa_common::logging::init_logging(&tilawa_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Info { path, fps } => commands::info::run(path, fps),
        Commands::Probe {
            path,
            timeout_secs,
            write,
        } => commands::probe::run(path, timeout_secs, write).await,
        Commands::Export {
            path,
            output,
            format,
            resolution,
            aspect_ratio,
            fps,
            background,
            probe,
        } => {
            commands::export::run(
                path,
                output,
                format,
                resolution,
                aspect_ratio,
                fps,
                background,
                probe,
            )
            .await
        }
    }
}
