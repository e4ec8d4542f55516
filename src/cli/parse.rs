//! CLI parse: clap types for Minewatch. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Minewatch CLI - mine-site video frame extraction and analysis
#[derive(Parser)]
#[command(name = "minewatch")]
#[command(about = "Extract frames from mine-site video and analyse them with a vision model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Write progress events as JSON lines to "stderr" or a file path
    #[arg(long)]
    pub progress: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract every Nth frame of a video into the frame directory
    Extract {
        /// Video file to sample
        #[arg(long)]
        video: PathBuf,
        /// Keep one frame out of every N; invalid values fall back to the default
        #[arg(long, allow_hyphen_values = true)]
        interval: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Analyse the frames currently in the frame directory
    Analyze {
        /// Site context included in every prompt
        #[arg(long)]
        context: Option<String>,
        /// Also summarize the analysis into a conclusion
        #[arg(long)]
        summarize: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Extract, analyse and summarize in one pass
    Run {
        /// Video file to sample
        #[arg(long)]
        video: PathBuf,
        /// Keep one frame out of every N
        #[arg(long, allow_hyphen_values = true)]
        interval: Option<String>,
        /// Site context included in every prompt
        #[arg(long)]
        context: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List the frames in the frame directory
    Frames {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Remove frames by file name or index
    Remove {
        /// Frame file names (frame_00003.jpg) or indices (3)
        frames: Vec<String>,
        /// Raw removal request body, e.g. {"frames": ["frame_00003.jpg"]}
        #[arg(long, conflicts_with = "frames")]
        json: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the effective configuration
    Config {
        /// Only validate; print nothing on success
        #[arg(long)]
        check: bool,
    },
}
