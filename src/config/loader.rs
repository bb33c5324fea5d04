// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Deserialize a raw config from TOML text.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` default functions).
/// - Checks for:
///   - empty runner identity fields,
///   - missing operators,
///   - duplicate step names,
///   - malformed durations and operator settings.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Default config path: `Runner.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Runner.toml")
}
