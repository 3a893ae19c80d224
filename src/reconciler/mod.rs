// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resource reconciler for developer environments.
//!
//! Apply and delete are idempotent multi-step sequences against the
//! cluster backend. They are not atomic: the first fatal backend error
//! aborts the remaining steps and earlier steps stay applied. Re-running the
//! same call is the recovery path.

pub mod engine;
pub mod graph;
pub mod ownership;

use thiserror::Error;

use crate::backend::BackendError;
use crate::k8s::{ResourceKind, ValidationError};

pub use engine::Reconciler;
pub use graph::ResourceGraph;
pub use ownership::Ownership;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid environment spec: {0}")]
    Validation(#[from] ValidationError),

    /// A backend call failed at `step`; earlier steps were left in place.
    #[error("Backend error at {step} step: {source}")]
    Backend {
        step: ResourceKind,
        #[source]
        source: BackendError,
    },
}

impl ReconcileError {
    pub(crate) fn at(step: ResourceKind) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::Backend { step, source }
    }
}
