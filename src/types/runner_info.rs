// src/types/runner_info.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{GroupName, Namespace, Step};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerType {
    #[default]
    Server,
    Client,
}

/// Read-only projection of a runner's capabilities at registration time.
///
/// This is a value snapshot: editing it never reaches the runner's live
/// operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunnerInfo {
    pub name: String,
    pub hostname: String,
    pub namespace: Namespace,
    pub group_name: GroupName,
    pub runner_type: RunnerType,
    pub steps: Vec<Step>,
}

impl RunnerInfo {
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// One pipeline's set of participating runners, keyed by runner name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: i32,
    pub runners: BTreeMap<String, RunnerInfo>,
}

impl Task {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            runners: BTreeMap::new(),
        }
    }

    /// Insert or replace the entry for `info.name`. No merge of steps.
    pub fn upsert(&mut self, info: RunnerInfo) -> Option<RunnerInfo> {
        self.runners.insert(info.name.clone(), info)
    }

    pub fn runner(&self, name: &str) -> Option<&RunnerInfo> {
        self.runners.get(name)
    }
}

/// Listing/addressing unit inside a namespace. Owns no execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Group {
    pub name: GroupName,
    pub tasks: Vec<Task>,
    pub runners: Vec<RunnerInfo>,
}

impl Group {
    pub fn new(name: GroupName) -> Self {
        Self {
            name,
            tasks: Vec::new(),
            runners: Vec::new(),
        }
    }

    /// Record a registration: upsert into the primary task and refresh the
    /// group's runner list (replace by name, otherwise append).
    pub fn register(&mut self, info: RunnerInfo) {
        if self.tasks.is_empty() {
            self.tasks.push(Task::new(0));
        }
        match self.runners.iter_mut().find(|r| r.name == info.name) {
            Some(existing) => *existing = info.clone(),
            None => self.runners.push(info.clone()),
        }
        self.tasks[0].upsert(info);
    }
}
