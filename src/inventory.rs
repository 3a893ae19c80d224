// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Read-side projections: environment listing, event tail, audit query.
//!
//! Listings combine live workload state with best-effort service and usage
//! lookups. A failed lookup leaves its field empty and never fails the list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::audit::{AuditEventLog, AuditFilter, Event};
use crate::backend::{BackendError, BackendHandles, ClusterBackend, UsageSource};
use crate::environment::{EnvironmentSpec, DEFAULT_CPU, DEFAULT_MEMORY};
use crate::k8s::placement::{gpu_from_limits, pool_from_node_selector};
use crate::k8s::{Deployment, LabelSelector, ResourceKind, Service, ServiceType};
use crate::reconciler::graph::{LABEL_OWNER, LABEL_TEAM};
use crate::usage::NormalizedUsage;

/// Audit query size when the caller gives none.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Event tail size when the caller gives none.
pub const DEFAULT_TAIL_LIMIT: usize = 50;

/// Live status of one environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentStatus {
    pub ready: u32,
    pub replicas: u32,
    pub created: Option<DateTime<Utc>>,
    pub service: Option<String>,
    pub cpu_used_m: Option<f64>,
    pub mem_used_mi: Option<f64>,
}

/// Spec reconstructed from the live workload, plus its status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSummary {
    pub spec: EnvironmentSpec,
    pub status: EnvironmentStatus,
}

pub struct Inventory {
    cluster: Arc<dyn ClusterBackend>,
    usage: Arc<dyn UsageSource>,
    audit: Arc<AuditEventLog>,
}

impl Inventory {
    pub fn new(backends: &BackendHandles, audit: Arc<AuditEventLog>) -> Self {
        Self { cluster: backends.cluster.clone(), usage: backends.usage.clone(), audit }
    }

    /// Environments of `team`, or of every team.
    ///
    /// # Errors
    /// Only the workload listing itself can fail
    pub async fn list_environments(&self, team: Option<&str>) -> Result<Vec<EnvironmentSummary>, BackendError> {
        let selector = match team {
            Some(team) => LabelSelector::new().equals(LABEL_TEAM, team),
            None => LabelSelector::new().exists(LABEL_TEAM),
        };

        let workloads = self.cluster.list_workloads(&selector).await?;
        let mut out = Vec::with_capacity(workloads.len());
        for dep in workloads {
            let namespace = dep.metadata.namespace.clone().unwrap_or_default();
            let name = dep.metadata.name.clone();

            let service = self.service_description(&namespace, &name).await;
            let usage = self.usage_of(&namespace, &name).await;

            out.push(EnvironmentSummary {
                status: EnvironmentStatus {
                    ready: dep.ready_replicas(),
                    replicas: dep.spec.replicas,
                    created: dep.metadata.creation_timestamp,
                    service,
                    cpu_used_m: usage.map(|u| u.cpu_millicores),
                    mem_used_mi: usage.map(|u| u.memory_mebibytes),
                },
                spec: spec_from_workload(&dep),
            });
        }
        Ok(out)
    }

    pub fn tail_events(&self, limit: Option<usize>) -> Vec<Event> {
        self.audit.tail(limit.unwrap_or(DEFAULT_TAIL_LIMIT))
    }

    /// Filtered audit history, newest first.
    ///
    /// The limit is clamped to `1..=query_max`.
    pub fn query_audit(&self, filter: &AuditFilter, limit: Option<usize>) -> Vec<Event> {
        let max = self.audit.settings().query_max.max(1);
        let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, max);
        self.audit.query(filter, limit)
    }

    async fn service_description(&self, namespace: &str, name: &str) -> Option<String> {
        match self.cluster.read(ResourceKind::Service, namespace, name).await {
            Ok(resource) => resource.into_service().map(|svc| describe_service(&svc)),
            Err(e) => {
                debug!(namespace, name, error = %e, "Service lookup failed");
                None
            }
        }
    }

    async fn usage_of(&self, namespace: &str, name: &str) -> Option<NormalizedUsage> {
        match self.usage.pod_usage(namespace, name).await {
            Ok(raw) => raw.and_then(|r| r.normalize()),
            Err(e) => {
                debug!(namespace, name, error = %e, "Usage lookup failed");
                None
            }
        }
    }
}

/// Rebuild the spec a workload was applied from.
pub fn spec_from_workload(dep: &Deployment) -> EnvironmentSpec {
    let template = &dep.spec.template;
    let container = dep.primary_container();
    let request = |key: &str, default: &str| {
        container
            .and_then(|c| c.resources.requests.get(key))
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| default.to_string())
    };

    let mut spec = EnvironmentSpec::new(
        dep.metadata.name.clone(),
        dep.metadata.namespace.clone().unwrap_or_default(),
        container.map(|c| c.image.clone()).unwrap_or_default(),
    );
    spec.owner = dep
        .metadata
        .labels
        .get(LABEL_OWNER)
        .or_else(|| template.metadata.labels.get(LABEL_OWNER))
        .cloned();
    spec.pool = pool_from_node_selector(&template.spec.node_selector);
    spec.priority = template.spec.priority_class_name.clone();
    spec.cpu = request("cpu", DEFAULT_CPU);
    spec.memory = request("memory", DEFAULT_MEMORY);
    spec.gpu = container.map(|c| gpu_from_limits(&c.resources.limits)).unwrap_or(0);
    spec
}

/// `NodePort:<nodePorts>` or `<type> <clusterIP>:<ports>`.
pub fn describe_service(svc: &Service) -> String {
    let join = |ports: Vec<String>| ports.join(", ");
    match svc.spec.service_type {
        ServiceType::NodePort => {
            let ports = svc
                .spec
                .ports
                .iter()
                .map(|p| p.node_port.map(|n| n.to_string()).unwrap_or_else(|| "<none>".to_string()))
                .collect();
            format!("NodePort:{}", join(ports))
        }
        other => {
            let ports = svc.spec.ports.iter().map(|p| p.port.to_string()).collect();
            format!(
                "{} {}:{}",
                other,
                svc.spec.cluster_ip.as_deref().unwrap_or("<none>"),
                join(ports)
            )
        }
    }
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;
