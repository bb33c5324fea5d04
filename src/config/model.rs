// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::DEFAULT_OUTPUT_CAPACITY;
use crate::operator::{FTP_OPERATOR_NAME, GIT_OPERATOR_NAME, SVN_OPERATOR_NAME};
use crate::types::StepPolicy;

/// Runner configuration as read from a TOML file, before validation.
///
/// ```toml
/// [runner]
/// name = "runner-a"
/// namespace = "default"
/// group_name = "web"
///
/// [[operator]]
/// kind = "git"
/// project_dir = "/srv/web"
/// branch = "master"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub runner: RunnerSection,

    /// All operators from `[[operator]]`, in declaration order.
    #[serde(default)]
    pub operator: Vec<OperatorConfig>,
}

/// Validated configuration. Construct through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub operator: Vec<OperatorConfig>,
    /// Parsed `[runner].stream_stall_timeout`.
    pub stream_stall_timeout: Duration,
    /// Parsed `[runner].step_timeout`, if any.
    pub step_timeout: Option<Duration>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        runner: RunnerSection,
        operator: Vec<OperatorConfig>,
        stream_stall_timeout: Duration,
        step_timeout: Option<Duration>,
    ) -> Self {
        Self {
            runner,
            operator,
            stream_stall_timeout,
            step_timeout,
        }
    }
}

/// `[runner]` section: identity and streaming limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    pub name: String,

    /// Falls back to `$HOSTNAME`, then `"localhost"`.
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    pub group_name: String,

    /// Lines buffered between a running step and its forwarder.
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,

    /// How long the forwarder waits on a stalled log stream consumer before
    /// dropping a chunk, e.g. `"30s"`.
    #[serde(default = "default_stream_stall_timeout")]
    pub stream_stall_timeout: String,

    /// Default deadline for a step run started from the CLI, e.g. `"30m"`.
    #[serde(default)]
    pub step_timeout: Option<String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_output_capacity() -> usize {
    DEFAULT_OUTPUT_CAPACITY
}

fn default_stream_stall_timeout() -> String {
    "30s".to_string()
}

impl RunnerSection {
    pub fn resolved_hostname(&self) -> String {
        self.hostname
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }
}

/// `[[operator]]` entry, discriminated by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OperatorConfig {
    Git(GitOperatorConfig),
    Svn(SvnOperatorConfig),
    Ftp(FtpOperatorConfig),
}

impl OperatorConfig {
    /// Step name the operator will own.
    pub fn step_name(&self) -> &str {
        match self {
            OperatorConfig::Git(c) => c.name.as_deref().unwrap_or(GIT_OPERATOR_NAME),
            OperatorConfig::Svn(c) => c.name.as_deref().unwrap_or(SVN_OPERATOR_NAME),
            OperatorConfig::Ftp(c) => c.name.as_deref().unwrap_or(FTP_OPERATOR_NAME),
        }
    }

    pub fn policy(&self) -> StepPolicy {
        match self {
            OperatorConfig::Git(c) => c.policy,
            OperatorConfig::Svn(c) => c.policy,
            OperatorConfig::Ftp(c) => c.policy,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OperatorConfig::Git(_) => "git",
            OperatorConfig::Svn(_) => "svn",
            OperatorConfig::Ftp(_) => "ftp",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitOperatorConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub policy: StepPolicy,
    /// Extra envs, carried through to the step untouched.
    #[serde(default)]
    pub envs: BTreeMap<String, String>,

    pub project_dir: String,
    pub branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SvnOperatorConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub policy: StepPolicy,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,

    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub remote_dir: String,
    pub work_dir: String,
    #[serde(default)]
    pub commit_message: Option<String>,
    /// `"pulling and waiting"` (default) or `"adding and committing"`.
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FtpOperatorConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub policy: StepPolicy,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,

    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub work_dir: String,
    /// Connect timeout in seconds.
    #[serde(default = "default_ftp_timeout")]
    pub timeout: u64,
    /// `"mark"` uploads into a fresh dated directory.
    #[serde(default)]
    pub mkdir: Option<String>,
}

fn default_ftp_timeout() -> u64 {
    30
}
