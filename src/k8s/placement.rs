// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Node placement for environment workloads.
//!
//! GPU and node-pool requests are expressed declaratively: a node selector
//! pins the pod to matching nodes and a toleration lets it onto the tainted
//! ones.

use std::collections::BTreeMap;

use super::types::{Labels, Toleration};

/// Extended resource name for GPU limits.
pub const GPU_RESOURCE: &str = "nvidia.com/gpu";

/// Node label and taint key marking GPU nodes.
pub const GPU_NODE_KEY: &str = "gpu";

/// Node label and taint key naming a node group.
pub const POOL_KEY: &str = "pool";

/// Legacy node label some clusters use for node groups.
pub const LEGACY_POOL_KEY: &str = "nodepool";

/// Scheduling constraints derived from an environment spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub node_selector: Labels,
    pub tolerations: Vec<Toleration>,
    pub limits: BTreeMap<String, String>,
    pub priority_class: Option<String>,
}

fn no_schedule_toleration(key: &str, value: &str) -> Toleration {
    Toleration {
        key: key.to_string(),
        operator: "Equal".to_string(),
        value: value.to_string(),
        effect: "NoSchedule".to_string(),
    }
}

impl Placement {
    /// Build placement for a pool / GPU / priority combination.
    pub fn for_request(pool: Option<&str>, gpu: u32, priority: Option<&str>) -> Self {
        let mut placement = Self {
            priority_class: priority.filter(|p| !p.is_empty()).map(str::to_string),
            ..Default::default()
        };

        if let Some(pool) = pool {
            placement.node_selector.insert(POOL_KEY.to_string(), pool.to_string());
            placement.tolerations.push(no_schedule_toleration(POOL_KEY, pool));
        }

        if gpu > 0 {
            placement.limits.insert(GPU_RESOURCE.to_string(), gpu.to_string());
            placement.node_selector.insert(GPU_NODE_KEY.to_string(), "true".to_string());
            placement.tolerations.push(no_schedule_toleration(GPU_NODE_KEY, "true"));
        }

        placement
    }

    pub fn requires_gpu(&self) -> bool {
        self.limits.contains_key(GPU_RESOURCE)
    }
}

/// Read the pool name back from a node selector.
pub fn pool_from_node_selector(node_selector: &Labels) -> Option<String> {
    node_selector
        .get(POOL_KEY)
        .or_else(|| node_selector.get(LEGACY_POOL_KEY))
        .cloned()
}

/// Read the GPU count back from container limits; 0 when absent or malformed.
pub fn gpu_from_limits(limits: &BTreeMap<String, String>) -> u32 {
    limits.get(GPU_RESOURCE).and_then(|v| v.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
#[path = "placement_tests.rs"]
mod tests;
