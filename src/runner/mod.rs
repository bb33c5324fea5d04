// src/runner/mod.rs

//! Runner-side dispatch engine.
//!
//! A [`Runner`] owns an ordered set of operators, each with a unique step
//! name. Requests address an operator by step name:
//! - `run` applies the desired step, resets transient fields, executes and
//!   streams output as [`LogStream`] chunks;
//! - `update` replaces only the envs of the stored step;
//! - `step` returns a snapshot, also while the step is running;
//! - `register` snapshots every step for the control plane.
//!
//! `run` and `update` on the same operator are serialized by a per-operator
//! async lock. Different operators run concurrently.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::{PublisherError, Result};
use crate::exec::{spawn_forwarder, CommandExecutor, OutputSink, RunContext, DEFAULT_OUTPUT_CAPACITY};
use crate::operator::{self, StepOperator};
use crate::protocol::LogStream;
use crate::types::{GroupName, Namespace, RunnerInfo, RunnerType, Step};

pub mod service;

pub use service::RunnerService;

/// Addressing identity a runner registers under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerIdentity {
    pub name: String,
    pub hostname: String,
    pub namespace: Namespace,
    pub group_name: GroupName,
}

impl RunnerIdentity {
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        namespace: impl Into<Namespace>,
        group_name: impl Into<GroupName>,
    ) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            namespace: namespace.into(),
            group_name: group_name.into(),
        }
    }
}

/// Streaming limits for step runs.
#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    pub output_capacity: usize,
    pub stream_stall_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            stream_stall_timeout: Duration::from_secs(30),
        }
    }
}

/// An operator plus the lock that keeps its run/update exclusive.
///
/// The name is captured at construction; runner-level requests never change
/// it because a run only applies a desired step with the same name.
struct OperatorSlot {
    name: String,
    operator: Arc<dyn StepOperator>,
    exclusive: Mutex<()>,
}

pub struct Runner {
    identity: RunnerIdentity,
    slots: Vec<OperatorSlot>,
    stream: mpsc::Sender<LogStream>,
    options: RunnerOptions,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("identity", &self.identity)
            .field("steps", &self.step_names())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Build a runner over `operators`, in order. Step names must be unique.
    pub fn new(
        identity: RunnerIdentity,
        operators: Vec<Arc<dyn StepOperator>>,
        stream: mpsc::Sender<LogStream>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(operators.len());

        for operator in operators {
            let name = operator.step().name;
            if !seen.insert(name.clone()) {
                return Err(PublisherError::DuplicateStep(name));
            }
            slots.push(OperatorSlot {
                name,
                operator,
                exclusive: Mutex::new(()),
            });
        }

        Ok(Self {
            identity,
            slots,
            stream,
            options: RunnerOptions::default(),
        })
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the runner and its operators from a validated config file.
    pub fn from_config(
        cfg: &ConfigFile,
        executor: Arc<dyn CommandExecutor>,
        stream: mpsc::Sender<LogStream>,
    ) -> Result<Self> {
        let identity = RunnerIdentity::new(
            cfg.runner.name.as_str(),
            cfg.runner.resolved_hostname(),
            cfg.runner.namespace.as_str(),
            cfg.runner.group_name.as_str(),
        );
        let operators = cfg
            .operator
            .iter()
            .map(|op| operator::from_config(op, Arc::clone(&executor)))
            .collect();

        Ok(Self::new(identity, operators, stream)?.with_options(RunnerOptions {
            output_capacity: cfg.runner.output_capacity,
            stream_stall_timeout: cfg.stream_stall_timeout,
        }))
    }

    pub fn identity(&self) -> &RunnerIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn options(&self) -> RunnerOptions {
        self.options
    }

    /// Step names in operator order.
    pub fn step_names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }

    fn slot(&self, name: &str) -> Result<&OperatorSlot> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PublisherError::StepOperatorNotFound(name.to_string()))
    }

    /// Snapshot of every step for registration with the control plane.
    pub fn register(&self) -> Result<RunnerInfo> {
        let steps = self
            .slots
            .iter()
            .map(|slot| {
                let mut step = slot.operator.step();
                step.runner_name = self.identity.name.clone();
                step
            })
            .collect();

        Ok(RunnerInfo {
            name: self.identity.name.clone(),
            hostname: self.identity.hostname.clone(),
            namespace: self.identity.namespace.clone(),
            group_name: self.identity.group_name.clone(),
            runner_type: RunnerType::Server,
            steps,
        })
    }

    /// Apply `desired` to its operator, reset it, run it and stream the
    /// output. Returns once the run has finished and every produced line
    /// has been handed to the stream or dropped; a non-zero drop count is
    /// recorded as a step message.
    pub async fn run(&self, desired: &Step, ctx: &RunContext) -> Result<()> {
        let slot = self.slot(&desired.name)?;
        let _guard = slot.exclusive.lock().await;

        info!(runner = %self.identity.name, step = %slot.name, "dispatching step");
        slot.operator.update(desired);
        slot.operator.prepare();

        let (sink, rx) = OutputSink::channel(self.options.output_capacity);
        let forwarder = spawn_forwarder(
            self.identity.name.clone(),
            slot.name.clone(),
            rx,
            self.stream.clone(),
            self.options.stream_stall_timeout,
            ctx.clone(),
        );

        let result = slot.operator.run(ctx, &sink).await;

        // Closing the sink lets the forwarder drain and finish.
        drop(sink);
        match forwarder.await {
            Ok(report) => {
                debug!(
                    runner = %self.identity.name,
                    step = %slot.name,
                    forwarded = report.forwarded,
                    dropped = report.dropped,
                    "output drained"
                );
                if report.dropped > 0 {
                    // The lines stay in the step output; only the live stream missed them.
                    let mut step = slot.operator.step();
                    step.append_message(&format!(
                        "log stream missed {} of {} output lines",
                        report.dropped,
                        report.forwarded + report.dropped
                    ));
                    slot.operator.update(&step);
                }
            }
            Err(e) => {
                warn!(runner = %self.identity.name, step = %slot.name, error = %e, "output forwarder aborted");
            }
        }

        result.map(|lines| {
            debug!(runner = %self.identity.name, step = %slot.name, lines = lines.len(), "step run complete");
        })
    }

    /// Replace only the envs of the named step.
    pub async fn update(&self, desired: &Step) -> Result<()> {
        let slot = self.slot(&desired.name)?;
        let _guard = slot.exclusive.lock().await;

        let mut current = slot.operator.step();
        current.envs = desired.envs.clone();
        slot.operator.update(&current);

        debug!(runner = %self.identity.name, step = %slot.name, envs = current.envs.len(), "step envs updated");
        Ok(())
    }

    /// Snapshot of the named step. Does not wait for a running step.
    pub fn step(&self, query: &Step) -> Result<Step> {
        Ok(self.slot(&query.name)?.operator.step())
    }
}
