// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Idle scale-down.
//!
//! Replicas are set directly rather than through the autoscaler, which
//! cannot go below its own minimum. Nothing here scales back up; re-applying
//! the environment does.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{AlertBatch, FailedScale, ScaleDownOutcome, ScaleTarget};
use crate::audit::{AuditEventLog, EventKind};
use crate::backend::ClusterBackend;
use crate::reconciler::ownership::{lookup_workload, Ownership};

pub struct IdleScaleDownHandler {
    backend: Arc<dyn ClusterBackend>,
    audit: Arc<AuditEventLog>,
    alert_name: String,
}

impl IdleScaleDownHandler {
    pub fn new(backend: Arc<dyn ClusterBackend>, audit: Arc<AuditEventLog>, alert_name: impl Into<String>) -> Self {
        Self { backend, audit, alert_name: alert_name.into() }
    }

    pub fn alert_name(&self) -> &str {
        &self.alert_name
    }

    /// Scale every firing idle alert's workload to zero.
    ///
    /// A failed scale is reported in the outcome and the rest of the batch
    /// still runs.
    pub async fn handle(&self, batch: &AlertBatch) -> ScaleDownOutcome {
        let mut outcome = ScaleDownOutcome::default();

        for alert in &batch.alerts {
            if !alert.is_firing() || alert.name() != Some(self.alert_name.as_str()) {
                outcome.skipped += 1;
                continue;
            }
            let Some(target) = alert.target() else {
                debug!(labels = ?alert.labels, "Idle alert without namespace/workload labels");
                outcome.skipped += 1;
                continue;
            };

            match self.scale_to_zero(&target).await {
                Ok(()) => outcome.scaled.push(target),
                Err(error) => outcome.failed.push(FailedScale { target, error }),
            }
        }

        outcome
    }

    async fn scale_to_zero(&self, target: &ScaleTarget) -> Result<(), String> {
        if let Err(e) = self.backend.scale_workload(&target.namespace, &target.workload, 0).await {
            warn!(target = %target, error = %e, "Idle scale-down failed");
            return Err(e.to_string());
        }

        let workload = lookup_workload(self.backend.as_ref(), &target.namespace, &target.workload).await;
        let extra = Ownership::resolve(None, workload.as_ref()).into_extra();
        let msg = format!("scaled to 0 ({} firing)", self.alert_name);
        self.audit
            .record(EventKind::Scale, &target.namespace, &target.workload, &msg, extra);

        metrics::counter!("devbox_idle_scale_down_total").increment(1);
        info!(target = %target, "Scaled idle environment to zero");
        Ok(())
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
