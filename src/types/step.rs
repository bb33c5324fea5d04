// src/types/step.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// High-level summary of where a Step is in its lifecycle.
///
/// `Unknown` is reserved for the control plane (e.g. lost contact with the
/// runner); the runner itself never sets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl StepPhase {
    /// `Succeeded` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, StepPhase::Succeeded | StepPhase::Failed)
    }
}

/// Trigger mode for a Step. Interpreted by the control plane only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPolicy {
    #[default]
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAvailability {
    #[default]
    Enable,
    Disable,
}

/// A file marked to be uploaded to a remote server by the step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFile {
    /// Absolute local path of the file.
    pub source_file: String,
    /// Remote directory that may need creating before the upload.
    pub target_path: String,
    /// Remote path of the uploaded file, relative to the work dir.
    pub target_file: String,
}

/// A file whose content is written on the runner host by the step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFile {
    pub target_file: String,
    pub content: String,
}

/// A unit of work: identity, phase, configuration and accumulated output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub id: i32,
    /// Unique among the operators of one runner.
    pub name: String,
    #[serde(rename = "status")]
    pub phase: StepPhase,
    pub policy: StepPolicy,
    /// Free-form configuration read by the operator. Keys the core does not
    /// know about are carried through untouched.
    pub envs: BTreeMap<String, String>,
    pub output: Vec<String>,
    pub upload_files: Vec<UploadFile>,
    pub write_files: Vec<WriteFile>,
    pub messages: Vec<String>,
    pub runner_name: String,
    pub available: StepAvailability,
    pub sharing_data: BTreeMap<String, String>,
    pub sharing_setting: bool,
}

impl Step {
    /// A freshly constructed step: `Pending`, no output, no messages.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A step that only carries a name, used to address queries.
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    pub fn with_envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.envs.get(key).map(String::as_str)
    }

    /// Append a human-readable progress note.
    pub fn append_message(&mut self, action: &str) {
        self.messages.push(step_message(&self.name, action));
    }
}

/// Format a progress note as `"<rfc3339> [<step>] <action>"`.
pub fn step_message(step: &str, action: &str) -> String {
    format!(
        "{} [{}] {}",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
        step,
        action
    )
}
