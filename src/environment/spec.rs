// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment spec - the only input the reconciler accepts.
//!
//! The spec is never persisted by this crate; durable state lives in the
//! cluster objects built from it.

use serde::{Deserialize, Serialize};

use crate::k8s::validation::{validate_dns1123_label, validate_image, validate_quantity};
use crate::k8s::ValidationError;

/// Default CPU request.
pub const DEFAULT_CPU: &str = "500m";

/// Default memory request.
pub const DEFAULT_MEMORY: &str = "1Gi";

fn default_cpu() -> String {
    DEFAULT_CPU.to_string()
}

fn default_memory() -> String {
    DEFAULT_MEMORY.to_string()
}

/// One team's developer environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Environment name; becomes the workload, service and autoscaler name.
    pub name: String,
    /// Owning team; becomes the namespace.
    pub team: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub base_image: String,
    /// Requested packages. Accepted and echoed back, not yet installed.
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default = "default_cpu")]
    pub cpu: String,
    #[serde(default = "default_memory")]
    pub memory: String,
    #[serde(default)]
    pub gpu: u32,
    /// Node group the environment must land on.
    #[serde(default)]
    pub pool: Option<String>,
    /// Priority class for the pod.
    #[serde(default)]
    pub priority: Option<String>,
}

impl EnvironmentSpec {
    /// Spec with every optional field at its default.
    pub fn new(name: impl Into<String>, team: impl Into<String>, base_image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team: team.into(),
            owner: None,
            base_image: base_image.into(),
            packages: Vec::new(),
            cpu: default_cpu(),
            memory: default_memory(),
            gpu: 0,
            pool: None,
            priority: None,
        }
    }

    /// Validate and normalize the spec.
    ///
    /// `name` and `team` are lowercased and checked against the DNS-1123
    /// label grammar. Blank optional strings collapse to `None` and blank
    /// quantities fall back to their defaults.
    ///
    /// # Errors
    /// Returns a `ValidationError` if any field fails validation
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.name = validate_dns1123_label(&self.name, "name")?;
        self.team = validate_dns1123_label(&self.team, "team")?;

        validate_image(&self.base_image)?;

        if self.cpu.trim().is_empty() {
            self.cpu = default_cpu();
        }
        if self.memory.trim().is_empty() {
            self.memory = default_memory();
        }
        validate_quantity(&self.cpu, "cpu")?;
        validate_quantity(&self.memory, "memory")?;

        self.owner = non_blank(self.owner);
        self.pool = non_blank(self.pool);
        self.priority = non_blank(self.priority);

        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
