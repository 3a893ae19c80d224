// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Idle alert intake.
//!
//! Alertmanager-style batches arrive as `{alerts: [{status, labels}]}`.
//! Firing idle alerts force their workload down to zero replicas.

pub mod handler;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use handler::IdleScaleDownHandler;

/// Label carrying the alert identifier.
pub const LABEL_ALERT_NAME: &str = "alertname";
pub const LABEL_NAMESPACE: &str = "namespace";

/// Workload name labels, first present wins.
pub const WORKLOAD_LABELS: [&str; 2] = ["env", "app"];

pub const STATUS_FIRING: &str = "firing";

/// One notification batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertBatch {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Alert {
    pub fn is_firing(&self) -> bool {
        self.status == STATUS_FIRING
    }

    pub fn name(&self) -> Option<&str> {
        self.labels.get(LABEL_ALERT_NAME).map(String::as_str)
    }

    /// Namespace and workload this alert points at, if both labels are set.
    pub fn target(&self) -> Option<ScaleTarget> {
        let namespace = self.labels.get(LABEL_NAMESPACE).filter(|v| !v.is_empty())?;
        let workload = WORKLOAD_LABELS
            .iter()
            .find_map(|key| self.labels.get(*key).filter(|v| !v.is_empty()))?;
        Some(ScaleTarget { namespace: namespace.clone(), workload: workload.clone() })
    }
}

/// Workload addressed by an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleTarget {
    pub namespace: String,
    pub workload: String,
}

impl std::fmt::Display for ScaleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.workload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedScale {
    pub target: ScaleTarget,
    pub error: String,
}

/// What a batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDownOutcome {
    pub scaled: Vec<ScaleTarget>,
    /// Alerts ignored: not firing, another alert, or missing labels.
    pub skipped: usize,
    pub failed: Vec<FailedScale>,
}
