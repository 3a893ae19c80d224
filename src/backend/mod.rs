// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Orchestration backend seam.
//!
//! The reconciler depends on exactly these verbs. Scheduling, placement and
//! consistency stay with the cluster; adapters only translate.

pub mod kubectl;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{BackendKind, Settings};
use crate::k8s::{Deployment, LabelSelector, Resource, ResourceKind};
use crate::usage::RawUsage;

pub use kubectl::KubectlBackend;
pub use memory::{MemoryBackend, Operation, Verb};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    /// Optimistic-concurrency write lost to a concurrent edit.
    #[error("{kind} {name} was modified concurrently: {message}")]
    Conflict { kind: ResourceKind, name: String, message: String },

    #[error("Backend rejected request: {0}")]
    Api(String),

    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Cannot decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// How dependents are removed when a workload is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Owner is removed only after its dependents are gone.
    Foreground,
    Background,
}

impl Propagation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

/// Verbs the reconciler and alert handler need from the cluster.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    async fn create(&self, resource: &Resource) -> Result<(), BackendError>;

    /// Replace wholesale. A `resourceVersion` on the object makes the write
    /// conditional on it still being current.
    async fn replace(&self, resource: &Resource) -> Result<(), BackendError>;

    /// Merge the object into the existing one.
    async fn patch(&self, resource: &Resource) -> Result<(), BackendError>;

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        propagation: Propagation,
    ) -> Result<(), BackendError>;

    async fn read(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Resource, BackendError>;

    /// Workloads across all namespaces matching `selector`.
    async fn list_workloads(&self, selector: &LabelSelector) -> Result<Vec<Deployment>, BackendError>;

    /// Set desired replicas directly, bypassing any autoscaler.
    async fn scale_workload(&self, namespace: &str, name: &str, replicas: u32) -> Result<(), BackendError>;
}

/// Raw per-instance usage from the cluster's metrics collector.
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Usage of the first running instance of `app`, if any is reported.
    async fn pod_usage(&self, namespace: &str, app: &str) -> Result<Option<RawUsage>, BackendError>;
}

/// Adapter handles selected at startup.
#[derive(Clone)]
pub struct BackendHandles {
    pub cluster: Arc<dyn ClusterBackend>,
    pub usage: Arc<dyn UsageSource>,
}

/// Build the adapter named by `settings.backend`.
pub fn select(settings: &Settings) -> BackendHandles {
    match settings.backend {
        BackendKind::Kubectl => {
            let backend = Arc::new(KubectlBackend::new(&settings.kubectl));
            BackendHandles { cluster: backend.clone(), usage: backend }
        }
        BackendKind::Memory => {
            let backend = Arc::new(MemoryBackend::new());
            BackendHandles { cluster: backend.clone(), usage: backend }
        }
    }
}
