// src/operator/mod.rs

//! The StepOperator capability and the bundled operators.
//!
//! An operator implements one deployment action and exclusively owns the
//! authoritative state of one [`Step`]. Callers only ever receive snapshots.
//!
//! - [`state`] holds the shared step cell and the phase bookkeeping every
//!   operator goes through.
//! - [`git`], [`svn`] and [`ftp`] are thin wrappers that build command lines
//!   and hand them to a [`CommandExecutor`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::OperatorConfig;
use crate::errors::Result;
use crate::exec::{CommandExecutor, OutputSink, RunContext};
use crate::types::Step;

pub mod ftp;
pub mod git;
pub mod state;
pub mod svn;

pub use ftp::{FtpOperator, FTP_OPERATOR_NAME};
pub use git::{GitOperator, GIT_OPERATOR_NAME};
pub use state::{StepState, SubSteps};
pub use svn::{SvnOperator, SVN_OPERATOR_NAME};

/// Future returned by [`StepOperator::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>>;

/// Contract every deployment action implements.
pub trait StepOperator: Send + Sync + fmt::Debug {
    /// Snapshot of the operator's current step.
    fn step(&self) -> Step;

    /// Replace the stored step wholesale with a copy of `desired`. The name
    /// is not checked against the operator's identity.
    fn update(&self, desired: &Step);

    /// Reset per-run transient fields (messages, output). Idempotent.
    fn prepare(&self);

    /// Execute the action's sub-steps in order, streaming their output into
    /// `output`. The first failing sub-step aborts the rest and leaves the
    /// step `Failed`; on success the step ends `Succeeded` and all produced
    /// lines are returned.
    fn run<'a>(&'a self, ctx: &'a RunContext, output: &'a OutputSink) -> RunFuture<'a>;
}

/// Build the operator described by a config entry.
pub fn from_config(
    cfg: &OperatorConfig,
    executor: Arc<dyn CommandExecutor>,
) -> Arc<dyn StepOperator> {
    match cfg {
        OperatorConfig::Git(c) => Arc::new(GitOperator::from_config(c, executor)),
        OperatorConfig::Svn(c) => Arc::new(SvnOperator::from_config(c, executor)),
        OperatorConfig::Ftp(c) => Arc::new(FtpOperator::from_config(c, executor)),
    }
}
