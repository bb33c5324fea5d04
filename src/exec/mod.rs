// src/exec/mod.rs

//! Command execution layer.
//!
//! Operators never spawn processes themselves; they hand command lines to a
//! [`CommandExecutor`] together with a [`RunContext`] and an [`OutputSink`].
//!
//! - [`backend`] defines the `CommandExecutor` trait and its error type.
//! - [`shell`] is the production executor (`sh -c` via `tokio::process`).
//! - [`context`] carries the cancellation token and optional deadline that
//!   bound a single step run.
//! - [`output`] holds the bounded output sink and the forwarder that turns
//!   sink lines into `LogStream` chunks.

pub mod backend;
pub mod context;
pub mod output;
pub mod shell;

pub use backend::{CommandError, CommandExecutor};
pub use context::{Interrupt, RunContext};
pub use output::{spawn_forwarder, ForwardReport, OutputSink, DEFAULT_OUTPUT_CAPACITY, MAX_OUTPUT_CAPACITY};
pub use shell::ShellExecutor;

/// Quote a value for safe interpolation into a POSIX shell command line.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
