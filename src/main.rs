use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod error;
mod git;
mod llm;
mod memory;
mod output;
mod persona;
mod publish;
mod runner;
#[cfg(test)]
mod testutil;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel, verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("moltlog")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("moltlog.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, then --verbose, then config log_level
    let mut builder = env_logger::Builder::new();

    let rust_log = std::env::var("RUST_LOG").ok();
    let level = if let Some(filter) = &rust_log {
        builder.parse_default_env();
        filter.clone()
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
        "debug".to_string()
    } else {
        builder.filter_level(match log_level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        });
        log_level.as_filter().to_string()
    };

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!("Log level: {} (from {})", level, log_level_source(rust_log.is_some(), verbose));
    Ok(())
}

/// Which setting decided the log level
fn log_level_source(rust_log_set: bool, verbose: bool) -> &'static str {
    if rust_log_set {
        "RUST_LOG env"
    } else if verbose {
        "--verbose"
    } else {
        "config"
    }
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            mode,
            day,
            date,
            no_post,
            no_commit,
            dry_run,
        } => commands::run::run(
            commands::run::RunArgs {
                mode,
                day,
                date,
                no_post,
                no_commit,
                dry_run,
            },
            cli.quiet,
            &config,
        ),
        Commands::Persona { action } => commands::persona::run(action, &config),
        Commands::Memory { action } => commands::memory::run(action, &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Doctor => commands::doctor::run(&config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config.log_level, cli.verbose).context("Failed to setup logging")?;

    info!("Starting moltlog with config from: {:?}", cli.config);

    if let Err(e) = run(cli, config) {
        log::error!("{:#}", e);
        return Err(e.wrap_err("Command failed"));
    }

    Ok(())
}
