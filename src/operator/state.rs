// src/operator/state.rs

//! Step ownership and the per-operator lifecycle state machine.
//!
//! ```text
//! Pending ──run──▶ Running ──all sub-steps ok──▶ Succeeded
//!                     ├──first sub-step error──▶ Failed
//!                     └──run future dropped────▶ Failed
//! Succeeded/Failed/Unknown ──run──▶ Running   (re-entrant, no history)
//! ```
//!
//! `Unknown` is never entered here; it belongs to the control plane.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::errors::{PublisherError, Result};
use crate::exec::{CommandExecutor, OutputSink, RunContext};
use crate::types::{Step, StepPhase, UploadFile};

/// Interior-mutable cell holding an operator's authoritative step.
///
/// The lock is only ever held for short synchronous sections, never across
/// an await, so snapshots stay available while the step is running.
#[derive(Debug)]
pub struct StepState {
    inner: Mutex<Step>,
}

impl StepState {
    /// Wrap a freshly constructed step: `Pending`, no output, no messages.
    pub fn new(mut step: Step) -> Self {
        step.phase = StepPhase::Pending;
        step.output.clear();
        step.messages.clear();
        Self {
            inner: Mutex::new(step),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Step> {
        // A panic mid-update leaves a complete `Step` value behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Step {
        self.lock().clone()
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn phase(&self) -> StepPhase {
        self.lock().phase
    }

    pub fn replace(&self, desired: &Step) {
        *self.lock() = desired.clone();
    }

    /// Mutate the stored step in one locked section.
    pub fn update_with<R>(&self, f: impl FnOnce(&mut Step) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn reset_transient(&self) {
        let mut step = self.lock();
        step.messages.clear();
        step.output.clear();
    }

    pub fn env(&self, key: &str) -> Option<String> {
        self.lock().envs.get(key).cloned()
    }

    /// A non-empty env value, or a configuration error naming the step.
    pub fn require_env(&self, key: &str) -> Result<String> {
        let step = self.lock();
        match step.envs.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value.clone()),
            _ => Err(PublisherError::Configuration(format!(
                "step '{}': missing env {key}",
                step.name
            ))),
        }
    }

    pub fn set_env(&self, key: &str, value: impl Into<String>) {
        self.lock().envs.insert(key.to_string(), value.into());
    }

    pub fn upload_files(&self) -> Vec<UploadFile> {
        self.lock().upload_files.clone()
    }

    pub fn append_message(&self, action: &str) {
        self.lock().append_message(action);
    }

    pub fn append_output(&self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.lock().output.extend_from_slice(lines);
    }

    /// Run `body` inside the lifecycle: `Running` on entry, then
    /// `Succeeded` or `Failed` depending on its result.
    pub async fn run_with<F>(&self, body: F) -> Result<Vec<String>>
    where
        F: Future<Output = Result<Vec<String>>>,
    {
        let name = {
            let mut step = self.lock();
            step.phase = StepPhase::Running;
            step.name.clone()
        };
        info!(step = %name, "step running");

        let abandoned = AbandonedRun {
            state: self,
            step: &name,
        };
        let result = body.await;
        std::mem::forget(abandoned);

        match &result {
            Ok(lines) => {
                self.lock().phase = StepPhase::Succeeded;
                info!(step = %name, lines = lines.len(), "step succeeded");
            }
            Err(e) => {
                self.lock().phase = StepPhase::Failed;
                warn!(step = %name, error = %e, "step failed");
            }
        }

        result
    }
}

/// Marks the step `Failed` if a run future is dropped before its body
/// completes, so it never stays `Running`.
struct AbandonedRun<'a> {
    state: &'a StepState,
    step: &'a str,
}

impl Drop for AbandonedRun<'_> {
    fn drop(&mut self) {
        self.state.lock().phase = StepPhase::Failed;
        warn!(step = %self.step, "step run dropped before completion");
    }
}

/// Fail-fast sequencer for an operator's sub-steps.
///
/// Every sub-step goes through the executor; its lines are appended to the
/// step output (also when it fails) and accumulated as the run result.
pub struct SubSteps<'a> {
    state: &'a StepState,
    executor: &'a dyn CommandExecutor,
    ctx: &'a RunContext,
    output: &'a OutputSink,
    step: String,
    results: Vec<String>,
}

impl<'a> SubSteps<'a> {
    pub fn new(
        state: &'a StepState,
        executor: &'a dyn CommandExecutor,
        ctx: &'a RunContext,
        output: &'a OutputSink,
    ) -> Self {
        Self {
            step: state.name(),
            state,
            executor,
            ctx,
            output,
            results: Vec::new(),
        }
    }

    pub fn step_name(&self) -> &str {
        &self.step
    }

    pub fn message(&self, action: &str) {
        self.state.append_message(action);
    }

    /// Run one sub-step and return the lines it produced.
    pub async fn exec(&mut self, label: &str, command: &str) -> Result<Vec<String>> {
        match self
            .executor
            .execute(label, command, self.ctx, self.output)
            .await
        {
            Ok(lines) => {
                self.state.append_output(&lines);
                self.results.extend(lines.iter().cloned());
                Ok(lines)
            }
            Err(e) => {
                self.state.append_output(e.output());
                warn!(step = %self.step, sub_step = %label, error = %e, "sub-step failed");
                Err(e.into_step_error(&self.step))
            }
        }
    }

    pub fn finish(self) -> Vec<String> {
        self.results
    }
}
