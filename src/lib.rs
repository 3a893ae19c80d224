// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Devbox core - ephemeral per-team developer environments.
//!
//! A declarative [`EnvironmentSpec`] is reconciled into a small resource
//! graph (namespace, workload, service, autoscaler) on a Kubernetes
//! cluster. Every lifecycle action lands in a bounded, crash-recoverable
//! audit trail, and idle alerts force-scale workloads to zero.

pub mod alerts;
pub mod audit;
pub mod backend;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod environment;
pub mod inventory;
pub mod k8s;
pub mod reconciler;
pub mod usage;

pub use alerts::{AlertBatch, IdleScaleDownHandler, ScaleDownOutcome};
pub use audit::{AuditEventLog, AuditFilter, Event, EventExtra, EventKind};
pub use backend::{BackendError, ClusterBackend, KubectlBackend, MemoryBackend, UsageSource};
pub use config::{ConfigError, Settings};
pub use dispatch::{ApplyDispatcher, Submission};
pub use environment::EnvironmentSpec;
pub use inventory::Inventory;
pub use k8s::ValidationError;
pub use reconciler::{ReconcileError, Reconciler, ResourceGraph};
