#![allow(dead_code)]

use std::sync::Arc;

use publisher::errors::Result;
use publisher::operator::StepOperator;
use publisher::protocol::LogStream;
use publisher::runner::{Runner, RunnerIdentity, RunnerOptions};
use publisher::types::{Step, StepPolicy, UploadFile};
use tokio::sync::mpsc;

/// Builder for `Step` to simplify test setup.
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            step: Step::new(name),
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.step.envs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn policy(mut self, policy: StepPolicy) -> Self {
        self.step.policy = policy;
        self
    }

    pub fn upload(mut self, source: &str, target: &str) -> Self {
        self.step.upload_files.push(UploadFile {
            source_file: source.to_string(),
            target_path: String::new(),
            target_file: target.to_string(),
        });
        self
    }

    pub fn runner_name(mut self, runner: &str) -> Self {
        self.step.runner_name = runner.to_string();
        self
    }

    pub fn build(self) -> Step {
        self.step
    }
}

/// Builder for `Runner`, wiring a log stream channel the test can read.
pub struct RunnerBuilder {
    identity: RunnerIdentity,
    operators: Vec<Arc<dyn StepOperator>>,
    options: RunnerOptions,
    stream_capacity: usize,
}

impl RunnerBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            identity: RunnerIdentity::new(name, "localhost", "default", "web"),
            operators: Vec::new(),
            options: RunnerOptions::default(),
            stream_capacity: 1024,
        }
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.identity.namespace = namespace.into();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.identity.group_name = group.into();
        self
    }

    pub fn operator(mut self, operator: impl StepOperator + 'static) -> Self {
        self.operators.push(Arc::new(operator));
        self
    }

    pub fn shared_operator(mut self, operator: Arc<dyn StepOperator>) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    pub fn try_build(self) -> Result<(Runner, mpsc::Receiver<LogStream>)> {
        let (tx, rx) = mpsc::channel(self.stream_capacity);
        let runner = Runner::new(self.identity, self.operators, tx)?.with_options(self.options);
        Ok((runner, rx))
    }

    pub fn build(self) -> (Runner, mpsc::Receiver<LogStream>) {
        self.try_build().expect("Failed to build runner from builder")
    }
}

/// Drain every chunk currently buffered in a log stream receiver.
pub fn drain_stream(rx: &mut mpsc::Receiver<LogStream>) -> Vec<LogStream> {
    let mut chunks = Vec::new();
    while let Ok(chunk) = rx.try_recv() {
        chunks.push(chunk);
    }
    chunks
}
