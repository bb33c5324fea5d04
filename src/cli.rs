// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::{default_config_path, parse_duration};

/// Command-line arguments for the `publisher` runner.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "publisher",
    version,
    about = "Runner agent: executes deployment steps (git, svn, ftp) and streams their output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the runner config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PUBLISHER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the runner and its operators, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the registration request this runner would send, as JSON.
    #[arg(long, conflicts_with = "step")]
    pub register: bool,

    /// Run a single step by name.
    #[arg(long, value_name = "NAME")]
    pub step: Option<String>,

    /// Env override for `--step`, repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair, requires = "step")]
    pub envs: Vec<(String, String)>,

    /// Deadline for `--step`, e.g. `90s` or `10m`. Overrides
    /// `[runner].step_timeout`.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, requires = "step")]
    pub timeout: Option<Duration>,
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

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
