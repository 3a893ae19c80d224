// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Best-effort owner/pool resolution from a live workload.

use tracing::debug;

use super::graph::{LABEL_OWNER, LABEL_POOL};
use crate::audit::EventExtra;
use crate::backend::ClusterBackend;
use crate::k8s::placement::pool_from_node_selector;
use crate::k8s::{Deployment, ResourceKind};

/// Owner and pool attached to audit events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ownership {
    pub owner: Option<String>,
    pub pool: Option<String>,
}

impl Ownership {
    /// Resolve from an explicit owner and the workload, if one was read.
    ///
    /// Owner: explicit, then object label, then pod-template label.
    /// Pool: object label, then pod-template label, then node selector.
    pub fn resolve(explicit_owner: Option<&str>, workload: Option<&Deployment>) -> Self {
        let explicit_owner = explicit_owner.filter(|o| !o.is_empty()).map(str::to_string);
        let Some(dep) = workload else {
            return Self { owner: explicit_owner, pool: None };
        };

        let meta = &dep.metadata.labels;
        let template = &dep.spec.template.metadata.labels;

        let owner = explicit_owner.or_else(|| meta.get(LABEL_OWNER).or_else(|| template.get(LABEL_OWNER)).cloned());
        let pool = meta
            .get(LABEL_POOL)
            .or_else(|| template.get(LABEL_POOL))
            .cloned()
            .or_else(|| pool_from_node_selector(&dep.spec.template.spec.node_selector));

        Self { owner, pool }
    }

    pub fn into_extra(self) -> EventExtra {
        EventExtra::new(self.owner, self.pool)
    }
}

/// Read a workload, treating any failure as "unknown".
pub async fn lookup_workload(backend: &dyn ClusterBackend, namespace: &str, name: &str) -> Option<Deployment> {
    match backend.read(ResourceKind::Workload, namespace, name).await {
        Ok(resource) => resource.into_workload(),
        Err(e) => {
            debug!(namespace, name, error = %e, "Ownership lookup failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "ownership_tests.rs"]
mod tests;
