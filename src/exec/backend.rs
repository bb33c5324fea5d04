// src/exec/backend.rs

//! Pluggable command executor abstraction.
//!
//! Operators talk to a `CommandExecutor` instead of spawning processes
//! directly. Production code uses [`super::ShellExecutor`]; tests provide a
//! scripted executor that records command lines and fails on demand.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::errors::PublisherError;

use super::{Interrupt, OutputSink, RunContext};

/// Failure of a single sub-step command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command ran and exited unsuccessfully. `output` holds every line
    /// it produced (already streamed to the sink).
    #[error("sub-step '{label}' exited with status {code}")]
    Exit {
        label: String,
        code: i32,
        output: Vec<String>,
    },

    /// The run context fired while the command was running.
    #[error("sub-step '{label}' interrupted: {reason:?}")]
    Interrupted {
        label: String,
        reason: Interrupt,
        output: Vec<String>,
    },

    /// The command could not be started or waited on.
    #[error(transparent)]
    Spawn(#[from] anyhow::Error),
}

impl CommandError {
    /// Lines the command produced before failing.
    pub fn output(&self) -> &[String] {
        match self {
            CommandError::Exit { output, .. } | CommandError::Interrupted { output, .. } => output,
            CommandError::Spawn(_) => &[],
        }
    }

    /// Convert into the crate error for the step that ran the command.
    pub fn into_step_error(self, step: &str) -> PublisherError {
        match self {
            CommandError::Interrupted { reason, .. } => reason.into_step_error(step),
            other => PublisherError::execution(step, other.to_string()),
        }
    }
}

/// Trait abstracting how operator sub-steps are executed.
pub trait CommandExecutor: Send + Sync + fmt::Debug {
    /// Run `command`, streaming every produced line to `output` as it
    /// arrives, and return all lines on success.
    ///
    /// `label` names the sub-step for logs and errors; command lines may
    /// carry credentials and are only logged at trace level.
    fn execute<'a>(
        &'a self,
        label: &'a str,
        command: &'a str,
        ctx: &'a RunContext,
        output: &'a OutputSink,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, CommandError>> + Send + 'a>>;
}
