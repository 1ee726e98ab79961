//! Command-line interface definitions.

mod check_config;
mod diagnostic;
mod output;
mod run;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use check_config::check_config;
pub use run::run;
pub use status::status;

/// A mean-reversion fade engine for binary sports prediction markets.
#[derive(Parser, Debug)]
#[command(name = "shockfade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "shockfade.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the fade engine (foreground).
    Run(RunArgs),

    /// Load the snapshot and print a summary of its contents.
    Status,

    /// Parse and validate the configuration file, then exit.
    CheckConfig,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Force dry-run mode even if the config file disables it.
    #[arg(long)]
    pub dry_run: bool,
}
