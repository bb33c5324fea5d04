// src/registry/mod.rs

//! Control-plane view of registered runners:
//! Namespace → Group → Task → RunnerInfo.
//!
//! The index of namespaces and groups sits behind one `RwLock` and only
//! grows. Every (namespace, group) partition has its own `Mutex`, so
//! registrations into the same task are serialized while other partitions
//! proceed independently.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, info};

use crate::errors::{PublisherError, Result};
use crate::types::{Group, GroupName, Namespace, RunnerInfo, Task};

pub mod control;

pub use control::ControlPlane;

type Partition = Arc<Mutex<Group>>;

/// In-memory runner registry. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct Registry {
    index: RwLock<BTreeMap<Namespace, BTreeMap<GroupName, Partition>>>,
}

fn poisoned(e: impl std::fmt::Display) -> PublisherError {
    PublisherError::Registry(e.to_string())
}

fn lock(partition: &Partition) -> Result<MutexGuard<'_, Group>> {
    partition.lock().map_err(poisoned)
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, namespace: &Namespace, group: &GroupName) -> Result<Option<Partition>> {
        let index = self.index.read().map_err(poisoned)?;
        Ok(index.get(namespace).and_then(|g| g.get(group)).cloned())
    }

    fn partition_or_create(&self, namespace: &Namespace, group: &GroupName) -> Result<Partition> {
        if let Some(p) = self.partition(namespace, group)? {
            return Ok(p);
        }

        let mut index = self.index.write().map_err(poisoned)?;
        let partition = index
            .entry(namespace.clone())
            .or_default()
            .entry(group.clone())
            .or_insert_with(|| {
                debug!(namespace = %namespace, group = %group, "creating registry partition");
                Arc::new(Mutex::new(Group::new(group.clone())))
            });
        Ok(Arc::clone(partition))
    }

    /// Upsert `info` into the primary task of its (namespace, group).
    /// A previous entry with the same runner name is replaced entirely.
    pub fn register_runner(&self, info: RunnerInfo) -> Result<()> {
        let partition = self.partition_or_create(&info.namespace, &info.group_name)?;
        let mut group = lock(&partition)?;

        info!(
            namespace = %info.namespace,
            group = %info.group_name,
            runner = %info.name,
            steps = info.steps.len(),
            "runner registered"
        );
        group.register(info);
        Ok(())
    }

    /// Namespaces in sorted order.
    pub fn list_namespace(&self) -> Result<Vec<String>> {
        let index = self.index.read().map_err(poisoned)?;
        Ok(index.keys().map(|ns| ns.to_string()).collect())
    }

    /// Group names of `namespace` in sorted order; empty if it is unknown.
    pub fn list_group_name(&self, namespace: &Namespace) -> Result<Vec<String>> {
        let index = self.index.read().map_err(poisoned)?;
        Ok(index
            .get(namespace)
            .map(|groups| groups.keys().map(|g| g.to_string()).collect())
            .unwrap_or_default())
    }

    /// Task snapshots of one group; empty if it is unknown.
    pub fn list_task(&self, namespace: &Namespace, group: &GroupName) -> Result<Vec<Task>> {
        let Some(partition) = self.partition(namespace, group)? else {
            return Ok(Vec::new());
        };
        let tasks = lock(&partition)?.tasks.clone();
        Ok(tasks)
    }

    /// Snapshot of a whole group, runners included.
    pub fn group(&self, namespace: &Namespace, group: &GroupName) -> Result<Option<Group>> {
        let Some(partition) = self.partition(namespace, group)? else {
            return Ok(None);
        };
        let snapshot = lock(&partition)?.clone();
        Ok(Some(snapshot))
    }
}
