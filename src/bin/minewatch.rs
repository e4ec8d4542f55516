//! Minewatch CLI Binary
//!
//! Command-line interface for mine-site frame extraction and analysis.

use anyhow::Context;
use clap::Parser;
use minewatch::cli::{Cli, RunContext};
use minewatch::config::ConfigLoader;
use minewatch::logging::{init_logging, LoggingConfig};
use minewatch::progress::{JsonLinesSink, ProgressSink};
use std::fs::OpenOptions;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Minewatch CLI starting");

    let mut context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => {
            info!("CLI context initialized");
            ctx
        }
        Err(e) => {
            error!("Error initializing workspace: {}", e);
            eprintln!("{}", minewatch::cli::map_error(&e));
            process::exit(1);
        }
    };

    if let Some(ref target) = cli.progress {
        match open_progress_sink(target) {
            Ok(sink) => context = context.with_progress_sink(sink),
            Err(e) => {
                eprintln!("{:#}", e);
                process::exit(1);
            }
        }
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", minewatch::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    if config.file.is_relative() {
        config.file = cli.workspace.join(&config.file);
    }

    config
}

/// `stderr` or a file path that progress lines are appended to
fn open_progress_sink(target: &str) -> anyhow::Result<Arc<dyn ProgressSink>> {
    if target == "stderr" {
        return Ok(Arc::new(JsonLinesSink::new(std::io::stderr())));
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .with_context(|| format!("Failed to open progress file {}", target))?;
    Ok(Arc::new(JsonLinesSink::new(file)))
}
