// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes integration types.
//!
//! Object model for the environment resource graph, field validation, and
//! placement (node selectors, tolerations, GPU limits).

pub mod placement;
pub mod types;
pub mod validation;

pub use placement::Placement;
pub use types::{
    Deployment, HorizontalPodAutoscaler, LabelSelector, Labels, Namespace, ObjectMeta, Resource,
    ResourceKind, Service, ServiceType,
};
pub use validation::{is_dns1123_label, validate_dns1123_label, ValidationError};

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
