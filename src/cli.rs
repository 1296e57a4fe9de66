// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::state::default_state_path;

/// Command-line arguments for `tfapply`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tfapply",
    version,
    about = "Apply, update and destroy a Terraform module.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the request file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Path to the state file recording the deployed identity and outputs.
    #[arg(long, value_name = "PATH", default_value_os_t = default_state_path())]
    pub state: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TFAPPLY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved operation, but don't run
    /// Terraform.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Plan and apply the module, then record its identity and outputs.
    Create,
    /// Same as `create`, against an existing deployment.
    Update,
    /// Destroy the module and clear the recorded state.
    Destroy,
    /// Print the recorded state.
    Output,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
