// src/operator/ftp.rs

//! Upload a step's `upload_files` to an FTP server through `curl`.
//!
//! With `PUBLISHER_FTP_MKDIR = "mark"` the files land in a fresh dated
//! directory (`YYYYMMDD_<n>`) under the work dir; the chosen directory is
//! written back into the step's envs.

use std::sync::Arc;

use anyhow::Context;
use regex::Regex;

use crate::config::FtpOperatorConfig;
use crate::errors::{PublisherError, Result};
use crate::exec::{shell_quote, CommandExecutor, OutputSink, RunContext};
use crate::types::envs::{
    PUBLISHER_FTP_HOST, PUBLISHER_FTP_MKDIR, PUBLISHER_FTP_PASSWORD, PUBLISHER_FTP_PORT,
    PUBLISHER_FTP_TIMEOUT, PUBLISHER_FTP_USERNAME, PUBLISHER_FTP_WORK_DIR,
};
use crate::types::Step;

use super::{RunFuture, StepOperator, StepState, SubSteps};

pub const FTP_OPERATOR_NAME: &str = "Ftp-Operator";
pub const FTP_MKDIR_MARK: &str = "mark";

#[derive(Debug)]
pub struct FtpOperator {
    state: StepState,
    executor: Arc<dyn CommandExecutor>,
}

struct FtpSettings {
    base_url: String,
    work_dir: String,
    auth: String,
    timeout: u64,
}

impl FtpSettings {
    fn curl(&self) -> String {
        format!(
            "curl --silent --show-error --connect-timeout {} --user {}",
            self.timeout, self.auth
        )
    }

    fn url(&self, path: &str) -> String {
        shell_quote(&format!("{}/{}", self.base_url, path))
    }
}

/// Join remote path segments with single slashes, skipping empty ones.
fn remote_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// A directory path with a trailing slash, or empty for the login directory.
fn dir_path(dir: &str) -> String {
    match remote_path(&[dir]) {
        path if path.is_empty() => path,
        path => format!("{path}/"),
    }
}

impl FtpOperator {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        work_dir: &str,
        timeout: u64,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        let port = port.to_string();
        let timeout = timeout.to_string();
        let step = Step::new(FTP_OPERATOR_NAME).with_envs([
            (PUBLISHER_FTP_HOST, host),
            (PUBLISHER_FTP_PORT, port.as_str()),
            (PUBLISHER_FTP_USERNAME, username),
            (PUBLISHER_FTP_PASSWORD, password),
            (PUBLISHER_FTP_WORK_DIR, work_dir),
            (PUBLISHER_FTP_TIMEOUT, timeout.as_str()),
        ]);
        Self {
            state: StepState::new(step),
            executor,
        }
    }

    pub fn from_config(cfg: &FtpOperatorConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        let op = Self::new(
            &cfg.host,
            cfg.port,
            &cfg.username,
            &cfg.password,
            &cfg.work_dir,
            cfg.timeout,
            executor,
        );
        op.state.update_with(|step| {
            if let Some(name) = &cfg.name {
                step.name = name.clone();
            }
            step.policy = cfg.policy;
            if let Some(mark) = &cfg.mkdir {
                step.envs
                    .insert(PUBLISHER_FTP_MKDIR.to_string(), mark.clone());
            }
            for (k, v) in &cfg.envs {
                step.envs.entry(k.clone()).or_insert_with(|| v.clone());
            }
        });
        op
    }

    fn numeric_env<T>(&self, key: &str) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.state.require_env(key)?;
        raw.trim().parse().map_err(|e: T::Err| {
            PublisherError::Configuration(format!(
                "step '{}': {key} = \"{raw}\": {e}",
                self.state.name()
            ))
        })
    }

    fn settings(&self) -> Result<FtpSettings> {
        let port: u16 = self.numeric_env(PUBLISHER_FTP_PORT)?;
        let timeout: u64 = self.numeric_env(PUBLISHER_FTP_TIMEOUT)?;
        let host = self.state.require_env(PUBLISHER_FTP_HOST)?;
        let username = self.state.require_env(PUBLISHER_FTP_USERNAME)?;
        let password = self.state.require_env(PUBLISHER_FTP_PASSWORD)?;
        let work_dir = self.state.env(PUBLISHER_FTP_WORK_DIR).unwrap_or_default();

        Ok(FtpSettings {
            base_url: format!("ftp://{host}:{port}"),
            work_dir: remote_path(&[&work_dir]),
            auth: shell_quote(&format!("{username}:{password}")),
            timeout,
        })
    }

    /// Pick `YYYYMMDD_<n+1>` where `n` counts today's existing directories.
    fn next_dated_dir(listing: &[String]) -> Result<String> {
        let date = chrono::Local::now().format("%Y%m%d").to_string();
        let pattern = Regex::new(&format!(r"^{}(_\d+)?$", regex::escape(&date)))
            .context("building dated directory pattern")?;
        let existing = listing
            .iter()
            .map(|line| line.trim().trim_end_matches('/'))
            .map(|line| line.rsplit('/').next().unwrap_or(line))
            .filter(|name| pattern.is_match(name))
            .count();
        Ok(format!("{date}_{}", existing + 1))
    }

    async fn sub_steps(&self, ctx: &RunContext, output: &OutputSink) -> Result<Vec<String>> {
        // Malformed port/timeout must fail before anything touches the server.
        let s = self.settings()?;
        let mark = self.state.env(PUBLISHER_FTP_MKDIR);
        let mut steps = SubSteps::new(&self.state, self.executor.as_ref(), ctx, output);

        let mut prefix = String::new();
        if mark.as_deref() == Some(FTP_MKDIR_MARK) {
            steps.message("list work dir");
            let listing = steps
                .exec(
                    "list",
                    &format!("{} --list-only {}", s.curl(), s.url(&dir_path(&s.work_dir))),
                )
                .await?;

            let dir = Self::next_dated_dir(&listing)?;
            self.state.set_env(PUBLISHER_FTP_MKDIR, dir.clone());

            steps.message(&format!("mkdir {dir}"));
            let mkd = format!("MKD {}", remote_path(&[&s.work_dir, &dir]));
            steps
                .exec(
                    "mkdir",
                    &format!("{} --quote {} {}", s.curl(), shell_quote(&mkd), s.url("")),
                )
                .await?;
            prefix = dir;
        }

        for file in self.state.upload_files() {
            let target = remote_path(&[&s.work_dir, &prefix, &file.target_file]);
            steps.message(&format!("upload {}", file.target_file));
            steps
                .exec(
                    "upload",
                    &format!(
                        "{} --ftp-create-dirs --upload-file {} {}",
                        s.curl(),
                        shell_quote(&file.source_file),
                        s.url(&target)
                    ),
                )
                .await?;
        }

        Ok(steps.finish())
    }
}

impl StepOperator for FtpOperator {
    fn step(&self) -> Step {
        self.state.snapshot()
    }

    fn update(&self, desired: &Step) {
        self.state.replace(desired);
    }

    fn prepare(&self) {
        self.state.reset_transient();
    }

    fn run<'a>(&'a self, ctx: &'a RunContext, output: &'a OutputSink) -> RunFuture<'a> {
        Box::pin(self.state.run_with(self.sub_steps(ctx, output)))
    }
}
