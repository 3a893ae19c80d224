// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-process backend adapter.
//!
//! Keeps objects in a concurrent map with API-server-like semantics:
//! resource versions, conditional replace, namespace existence, merge
//! patch. Every call is journaled and failures can be injected, which makes
//! it the adapter for dry runs and tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use super::{BackendError, ClusterBackend, Propagation, UsageSource};
use crate::k8s::types::DeploymentStatus;
use crate::k8s::{Deployment, LabelSelector, Resource, ResourceKind};
use crate::usage::RawUsage;

/// Journal entries kept before the oldest are dropped.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 10_000;

/// Backend verb, as recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Replace,
    Patch,
    Delete,
    Read,
    List,
    Scale,
}

/// One journaled backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub verb: Verb,
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

type ObjectKey = (ResourceKind, String, String);

struct InjectedFailure {
    verb: Verb,
    kind: ResourceKind,
    error: BackendError,
}

/// Concurrent in-memory cluster.
pub struct MemoryBackend {
    objects: DashMap<ObjectKey, Resource>,
    usage: DashMap<(String, String), RawUsage>,
    next_version: AtomicU64,
    next_cluster_ip: AtomicU64,
    /// Oldest first, bounded by `journal_capacity`.
    journal: Mutex<VecDeque<Operation>>,
    journal_capacity: usize,
    failures: Mutex<Vec<InjectedFailure>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_journal_capacity(DEFAULT_JOURNAL_CAPACITY)
    }

    /// Backend keeping only the `capacity` most recent journal entries.
    pub fn with_journal_capacity(capacity: usize) -> Self {
        Self {
            objects: DashMap::new(),
            usage: DashMap::new(),
            next_version: AtomicU64::new(1),
            next_cluster_ip: AtomicU64::new(10),
            journal: Mutex::new(VecDeque::new()),
            journal_capacity: capacity,
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Make the next `verb` on `kind` fail with `error`.
    pub fn fail_next(&self, verb: Verb, kind: ResourceKind, error: BackendError) {
        self.failures.lock().push(InjectedFailure { verb, kind, error });
    }

    /// Report `usage` for the first instance of `app` in `namespace`.
    pub fn set_usage(&self, namespace: &str, app: &str, usage: RawUsage) {
        self.usage.insert((namespace.to_string(), app.to_string()), usage);
    }

    pub fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<Resource> {
        self.objects.get(&key(kind, namespace, name)).map(|r| r.value().clone())
    }

    pub fn workload(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.get(ResourceKind::Workload, namespace, name).and_then(Resource::into_workload)
    }

    pub fn contains(&self, kind: ResourceKind, namespace: &str, name: &str) -> bool {
        self.objects.contains_key(&key(kind, namespace, name))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.journal.lock().iter().cloned().collect()
    }

    pub fn count(&self, verb: Verb, kind: ResourceKind) -> usize {
        self.journal.lock().iter().filter(|op| op.verb == verb && op.kind == kind).count()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    fn begin(&self, verb: Verb, kind: ResourceKind, namespace: &str, name: &str) -> Result<(), BackendError> {
        {
            let mut journal = self.journal.lock();
            journal.push_back(Operation {
                verb,
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
            while journal.len() > self.journal_capacity {
                journal.pop_front();
            }
        }

        let mut failures = self.failures.lock();
        match failures.iter().position(|f| f.verb == verb && f.kind == kind) {
            Some(i) => Err(failures.remove(i).error),
            None => Ok(()),
        }
    }

    fn bump_version(&self) -> String {
        self.next_version.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn assign_cluster_ip(&self) -> String {
        let n = self.next_cluster_ip.fetch_add(1, Ordering::SeqCst);
        format!("10.96.{}.{}", (n / 250) % 250, n % 250 + 1)
    }

    fn require_namespace(&self, resource: &Resource) -> Result<(), BackendError> {
        let Some(ns) = resource.namespace() else { return Ok(()) };
        if self.objects.contains_key(&key(ResourceKind::Namespace, "", ns)) {
            Ok(())
        } else {
            Err(BackendError::NotFound { kind: ResourceKind::Namespace, name: ns.to_string() })
        }
    }

    /// Fill in server-owned fields on a freshly stored object.
    fn settle(&self, resource: &mut Resource, previous: Option<&Resource>) {
        let version = self.bump_version();
        let meta = resource.metadata_mut();
        meta.resource_version = Some(version);
        meta.creation_timestamp = previous
            .and_then(|p| p.metadata().creation_timestamp)
            .or_else(|| Some(Utc::now().trunc_subsecs(0)));

        match resource {
            Resource::Workload(dep) => {
                let replicas = dep.spec.replicas;
                dep.status = Some(DeploymentStatus { replicas: Some(replicas), ready_replicas: Some(replicas) });
            }
            Resource::Service(svc) => {
                let prior_ip = previous
                    .and_then(|p| match p {
                        Resource::Service(s) => s.spec.cluster_ip.clone(),
                        _ => None,
                    });
                if svc.spec.cluster_ip.is_none() {
                    svc.spec.cluster_ip = prior_ip.or_else(|| Some(self.assign_cluster_ip()));
                }
            }
            _ => {}
        }
    }
}

fn key(kind: ResourceKind, namespace: &str, name: &str) -> ObjectKey {
    let ns = if kind.is_namespaced() { namespace } else { "" };
    (kind, ns.to_string(), name.to_string())
}

fn resource_key(resource: &Resource) -> ObjectKey {
    key(resource.kind(), resource.namespace().unwrap_or(""), resource.name())
}

/// RFC 7386 JSON merge patch.
fn merge_patch(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (k, v) in patch {
                if v.is_null() {
                    target.remove(k);
                } else {
                    merge_patch(target.entry(k.clone()).or_insert(Value::Null), v);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[async_trait]
impl ClusterBackend for MemoryBackend {
    async fn create(&self, resource: &Resource) -> Result<(), BackendError> {
        let kind = resource.kind();
        self.begin(Verb::Create, kind, resource.namespace().unwrap_or(""), resource.name())?;
        self.require_namespace(resource)?;

        match self.objects.entry(resource_key(resource)) {
            Entry::Occupied(_) => Err(BackendError::AlreadyExists { kind, name: resource.name().to_string() }),
            Entry::Vacant(slot) => {
                let mut stored = resource.clone();
                self.settle(&mut stored, None);
                slot.insert(stored);
                Ok(())
            }
        }
    }

    async fn replace(&self, resource: &Resource) -> Result<(), BackendError> {
        let kind = resource.kind();
        let name = resource.name().to_string();
        self.begin(Verb::Replace, kind, resource.namespace().unwrap_or(""), &name)?;

        let Some(mut current) = self.objects.get_mut(&resource_key(resource)) else {
            return Err(BackendError::NotFound { kind, name });
        };
        if let Some(ref expected) = resource.metadata().resource_version {
            if current.metadata().resource_version.as_ref() != Some(expected) {
                return Err(BackendError::Conflict {
                    kind,
                    name,
                    message: "the object has been modified".to_string(),
                });
            }
        }

        let previous = current.value().clone();
        let mut stored = resource.clone();
        self.settle(&mut stored, Some(&previous));
        *current = stored;
        Ok(())
    }

    async fn patch(&self, resource: &Resource) -> Result<(), BackendError> {
        let kind = resource.kind();
        let name = resource.name().to_string();
        self.begin(Verb::Patch, kind, resource.namespace().unwrap_or(""), &name)?;

        let Some(mut current) = self.objects.get_mut(&resource_key(resource)) else {
            return Err(BackendError::NotFound { kind, name });
        };

        let encode = |r: &Resource| serde_json::to_value(r).map_err(|e| BackendError::Decode(e.to_string()));
        let mut merged = encode(current.value())?;
        let mut patch = encode(resource)?;
        if let Some(meta) = patch.get_mut("metadata").and_then(Value::as_object_mut) {
            meta.remove("resourceVersion");
            meta.remove("creationTimestamp");
        }
        merge_patch(&mut merged, &patch);

        let bytes = serde_json::to_vec(&merged).map_err(|e| BackendError::Decode(e.to_string()))?;
        let mut stored = Resource::from_json(kind, &bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
        let previous = current.value().clone();
        self.settle(&mut stored, Some(&previous));
        *current = stored;
        Ok(())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        propagation: Propagation,
    ) -> Result<(), BackendError> {
        self.begin(Verb::Delete, kind, namespace, name)?;

        if self.objects.remove(&key(kind, namespace, name)).is_none() {
            return Err(BackendError::NotFound { kind, name: name.to_string() });
        }
        if kind == ResourceKind::Workload && propagation == Propagation::Foreground {
            // Managed instances go with their owner.
            self.usage.remove(&(namespace.to_string(), name.to_string()));
        }
        Ok(())
    }

    async fn read(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Resource, BackendError> {
        self.begin(Verb::Read, kind, namespace, name)?;
        self.get(kind, namespace, name)
            .ok_or_else(|| BackendError::NotFound { kind, name: name.to_string() })
    }

    async fn list_workloads(&self, selector: &LabelSelector) -> Result<Vec<Deployment>, BackendError> {
        self.begin(Verb::List, ResourceKind::Workload, "", &selector.to_string())?;

        let mut found: Vec<Deployment> = self
            .objects
            .iter()
            .filter_map(|entry| match entry.value() {
                Resource::Workload(dep) if selector.matches(&dep.metadata.labels) => Some(dep.clone()),
                _ => None,
            })
            .collect();
        found.sort_by(|a, b| {
            (&a.metadata.namespace, &a.metadata.name).cmp(&(&b.metadata.namespace, &b.metadata.name))
        });
        Ok(found)
    }

    async fn scale_workload(&self, namespace: &str, name: &str, replicas: u32) -> Result<(), BackendError> {
        self.begin(Verb::Scale, ResourceKind::Workload, namespace, name)?;

        let Some(mut current) = self.objects.get_mut(&key(ResourceKind::Workload, namespace, name)) else {
            return Err(BackendError::NotFound { kind: ResourceKind::Workload, name: name.to_string() });
        };
        let version = self.bump_version();
        if let Resource::Workload(dep) = current.value_mut() {
            dep.spec.replicas = replicas;
            dep.status = Some(DeploymentStatus { replicas: Some(replicas), ready_replicas: Some(replicas) });
            dep.metadata.resource_version = Some(version);
        }
        Ok(())
    }
}

#[async_trait]
impl UsageSource for MemoryBackend {
    async fn pod_usage(&self, namespace: &str, app: &str) -> Result<Option<RawUsage>, BackendError> {
        let running = self
            .workload(namespace, app)
            .map(|dep| dep.ready_replicas() > 0)
            .unwrap_or(false);
        if !running {
            return Ok(None);
        }
        Ok(self.usage.get(&(namespace.to_string(), app.to_string())).map(|u| u.value().clone()))
    }
}
