// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Apply and delete for environment resource graphs.

use std::sync::Arc;

use tracing::{info, warn};

use super::graph::ResourceGraph;
use super::ownership::{lookup_workload, Ownership};
use super::ReconcileError;
use crate::audit::{AuditEventLog, EventExtra, EventKind};
use crate::backend::{BackendError, ClusterBackend, Propagation};
use crate::config::Settings;
use crate::environment::EnvironmentSpec;
use crate::k8s::{validate_dns1123_label, Resource, ResourceKind};

pub const MSG_SUBMITTED: &str = "submitted";
pub const MSG_READY: &str = "deployment+service ready";
pub const MSG_DELETE_REQUESTED: &str = "delete requested";
pub const MSG_DELETE_ISSUED: &str = "delete issued (autoscaler+service+workload)";

/// Drives the backend toward a declared environment.
pub struct Reconciler {
    backend: Arc<dyn ClusterBackend>,
    audit: Arc<AuditEventLog>,
    settings: Arc<Settings>,
}

impl Reconciler {
    pub fn new(backend: Arc<dyn ClusterBackend>, audit: Arc<AuditEventLog>, settings: Arc<Settings>) -> Self {
        Self { backend, audit, settings }
    }

    pub fn audit(&self) -> &Arc<AuditEventLog> {
        &self.audit
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Create or update every member of the environment's graph.
    ///
    /// Emits "submitted" once the spec validates and "ready" after the last
    /// step. A backend failure stops at that step and is returned.
    ///
    /// # Errors
    /// `Validation` before any side effect, `Backend` for the failing step
    pub async fn apply(&self, spec: EnvironmentSpec) -> Result<ResourceGraph, ReconcileError> {
        let spec = spec.validated()?;
        let extra = EventExtra::new(spec.owner.clone(), spec.pool.clone());
        self.audit
            .record(EventKind::Create, &spec.team, &spec.name, MSG_SUBMITTED, extra.clone());

        let graph = ResourceGraph::build(&spec, &self.settings);
        let result = self.apply_graph(&graph).await;
        record_outcome("apply", result.is_ok());

        match result {
            Ok(()) => {
                self.audit.record(EventKind::Create, &spec.team, &spec.name, MSG_READY, extra);
                info!(team = %spec.team, name = %spec.name, "Environment applied");
                Ok(graph)
            }
            Err(e) => {
                warn!(team = %spec.team, name = %spec.name, error = %e, "Environment apply aborted");
                Err(e)
            }
        }
    }

    async fn apply_graph(&self, graph: &ResourceGraph) -> Result<(), ReconcileError> {
        let namespace = Resource::Namespace(graph.namespace.clone());
        match self.backend.create(&namespace).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(ReconcileError::at(ResourceKind::Namespace)(e)),
        }

        self.create_or_replace(Resource::Workload(graph.workload.clone()))
            .await
            .map_err(ReconcileError::at(ResourceKind::Workload))?;

        self.create_or_patch(Resource::Service(graph.service.clone()))
            .await
            .map_err(ReconcileError::at(ResourceKind::Service))?;

        if let Some(ref hpa) = graph.autoscaler {
            self.create_or_replace(Resource::Autoscaler(hpa.clone()))
                .await
                .map_err(ReconcileError::at(ResourceKind::Autoscaler))?;
        }
        Ok(())
    }

    /// Create, or on "already exists" replace conditionally on the
    /// `resourceVersion` just observed. A concurrent write in between comes
    /// back as `Conflict`.
    async fn create_or_replace(&self, desired: Resource) -> Result<(), BackendError> {
        match self.backend.create(&desired).await {
            Err(e) if e.is_already_exists() => {
                let kind = desired.kind();
                let namespace = desired.namespace().unwrap_or("").to_string();
                let current = self.backend.read(kind, &namespace, desired.name()).await?;

                let mut desired = desired;
                desired.metadata_mut().resource_version = current.metadata().resource_version.clone();
                self.backend.replace(&desired).await
            }
            other => other,
        }
    }

    async fn create_or_patch(&self, desired: Resource) -> Result<(), BackendError> {
        match self.backend.create(&desired).await {
            Err(e) if e.is_already_exists() => self.backend.patch(&desired).await,
            other => other,
        }
    }

    /// Delete the environment's workload, service and autoscaler.
    ///
    /// Owner and pool are resolved best-effort for the audit trail. Members
    /// that are already gone count as deleted.
    ///
    /// # Errors
    /// `Validation` for a malformed team or name, `Backend` for the first
    /// deletion that fails with anything but "not found"
    pub async fn delete(&self, team: &str, name: &str, owner: Option<&str>) -> Result<(), ReconcileError> {
        let team = validate_dns1123_label(team, "team")?;
        let name = validate_dns1123_label(name, "name")?;

        let workload = lookup_workload(self.backend.as_ref(), &team, &name).await;
        let extra = Ownership::resolve(owner, workload.as_ref()).into_extra();

        self.audit
            .record(EventKind::Delete, &team, &name, MSG_DELETE_REQUESTED, extra.clone());

        let result = self.delete_members(&team, &name).await;
        record_outcome("delete", result.is_ok());

        match result {
            Ok(()) => {
                self.audit.record(EventKind::Delete, &team, &name, MSG_DELETE_ISSUED, extra);
                info!(team = %team, name = %name, "Environment delete issued");
                Ok(())
            }
            Err(e) => {
                warn!(team = %team, name = %name, error = %e, "Environment delete aborted");
                Err(e)
            }
        }
    }

    async fn delete_members(&self, team: &str, name: &str) -> Result<(), ReconcileError> {
        for (kind, propagation) in [
            (ResourceKind::Workload, Propagation::Foreground),
            (ResourceKind::Service, Propagation::Background),
            (ResourceKind::Autoscaler, Propagation::Background),
        ] {
            match self.backend.delete(kind, team, name, propagation).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(ReconcileError::at(kind)(e)),
            }
        }
        Ok(())
    }
}

fn record_outcome(op: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("devbox_reconcile_total", "op" => op, "outcome" => outcome).increment(1);
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
