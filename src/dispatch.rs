// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Submit-and-return apply.
//!
//! The spec is validated before anything is spawned, so a caller that gets
//! a [`Submission`] back knows the request was well-formed. Completion is
//! observed through listings, the audit trail, or by awaiting the handle.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::environment::EnvironmentSpec;
use crate::k8s::ValidationError;
use crate::reconciler::{ReconcileError, Reconciler, ResourceGraph};

pub const STATUS_SUBMITTED: &str = "submitted";

/// Acknowledgement of a dispatched apply.
#[derive(Debug, Serialize)]
pub struct Submission {
    pub status: &'static str,
    pub team: String,
    pub name: String,
    #[serde(skip)]
    pub handle: JoinHandle<Result<ResourceGraph, ReconcileError>>,
}

#[derive(Clone)]
pub struct ApplyDispatcher {
    reconciler: Arc<Reconciler>,
}

impl ApplyDispatcher {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    /// Validate `spec` and hand the apply to the runtime.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns the validation error; nothing is spawned in that case
    pub fn submit(&self, spec: EnvironmentSpec) -> Result<Submission, ValidationError> {
        let spec = spec.validated()?;
        let team = spec.team.clone();
        let name = spec.name.clone();

        let reconciler = Arc::clone(&self.reconciler);
        let handle = tokio::spawn(async move {
            let result = reconciler.apply(spec).await;
            if let Err(ref e) = result {
                error!(error = %e, "Dispatched apply failed");
            }
            result
        });

        debug!(team = %team, name = %name, "Apply dispatched");
        Ok(Submission { status: STATUS_SUBMITTED, team, name, handle })
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
