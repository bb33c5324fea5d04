// src/protocol/mod.rs

//! Message shapes exchanged between runners and the control plane.
//!
//! All messages are plain values; nothing here shares mutable state across
//! the boundary. Transport is out of scope: the generic [`Request`] /
//! [`Response`] envelope carries an opaque `data` payload keyed by `type`,
//! with serde_json as the default codec.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::types::{GroupName, Namespace, RunnerInfo, Step, Task};

pub mod envelope;

pub use envelope::{Request, Response};

/// Envelope `type` keys.
pub mod request_type {
    // Served by the control plane.
    pub const REGISTER_RUNNER: &str = "registerRunner";
    pub const LIST_NAMESPACE: &str = "listNamespace";
    pub const LIST_GROUP_NAME: &str = "listGroupName";
    pub const LIST_TASK: &str = "listTask";

    // Served by a runner.
    pub const REGISTER: &str = "register";
    pub const RUN: &str = "run";
    pub const UPDATE: &str = "update";
    pub const STEP: &str = "step";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRunnerRequest {
    pub runner_info: RunnerInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRunnerResponse {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNamespaceRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNamespaceResponse {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroupNameRequest {
    pub namespace: Namespace,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListGroupNameResponse {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTaskRequest {
    pub namespace: Namespace,
    pub group_name: GroupName,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTaskResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub runner_info: RunnerInfo,
}

/// Ask a runner to run the desired step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStepRequest {
    pub step: Step,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStepResponse {}

/// Replace the envs of a runner's step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStepRequest {
    pub step: Step,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStepResponse {}

/// Query a runner's step by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRequest {
    pub step: Step,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResponse {
    pub step: Step,
}

/// One chunk of streamed execution output, pushed out of band.
///
/// Chunks are ordered per `(runner, step)`; there is no ordering across
/// runners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStream {
    pub runner: String,
    pub step: String,
    pub output: Vec<u8>,
}

impl LogStream {
    pub fn new(runner: &str, step: &str, line: impl Into<String>) -> Self {
        Self {
            runner: runner.to_string(),
            step: step.to_string(),
            output: line.into().into_bytes(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}
