//! CLI command-name contract for progress sessions.

use crate::cli::parse::Commands;

/// Command name recorded in the `session_started` progress event
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Extract { .. } => "extract",
        Commands::Analyze { .. } => "analyze",
        Commands::Run { .. } => "run",
        Commands::Frames { .. } => "frames",
        Commands::Remove { .. } => "remove",
        Commands::Config { .. } => "config",
    }
}
