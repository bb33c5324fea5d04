// src/config/mod.rs

//! Configuration loading and validation for a runner.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate identity, operators and durations (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{
    ConfigFile, FtpOperatorConfig, GitOperatorConfig, OperatorConfig, RawConfigFile,
    RunnerSection, SvnOperatorConfig,
};
