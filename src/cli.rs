//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the site session.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_analysis_text, format_extraction_text, format_frames_text, format_removal_text,
    format_run_text, AnalysisOutcome, ExtractionOutcome, RunOutcome,
};
pub use route::RunContext;
